//! Anatomical structure labels used by brain models and parcels.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

macro_rules! define_structures {
    ($($variant:ident => $tag:literal),+ $(,)?) => {
        /// Anatomical structure a brain model or parcel surface refers to.
        ///
        /// The XML form is the `CIFTI_STRUCTURE_*` tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Structure {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl Structure {
            /// Every known structure, in declaration order.
            pub const ALL: &'static [Structure] = &[$(Structure::$variant),+];

            /// XML tag for this structure.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Structure::$variant => $tag,)+
                }
            }
        }

        impl std::str::FromStr for Structure {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($tag => Ok(Structure::$variant),)+
                    _ => Err(Error::UnknownStructure(s.to_string())),
                }
            }
        }
    };
}

define_structures! {
    CortexLeft => "CIFTI_STRUCTURE_CORTEX_LEFT",
    CortexRight => "CIFTI_STRUCTURE_CORTEX_RIGHT",
    Cortex => "CIFTI_STRUCTURE_CORTEX",
    AccumbensLeft => "CIFTI_STRUCTURE_ACCUMBENS_LEFT",
    AccumbensRight => "CIFTI_STRUCTURE_ACCUMBENS_RIGHT",
    AllWhiteMatter => "CIFTI_STRUCTURE_ALL_WHITE_MATTER",
    AllGreyMatter => "CIFTI_STRUCTURE_ALL_GREY_MATTER",
    AmygdalaLeft => "CIFTI_STRUCTURE_AMYGDALA_LEFT",
    AmygdalaRight => "CIFTI_STRUCTURE_AMYGDALA_RIGHT",
    BrainStem => "CIFTI_STRUCTURE_BRAIN_STEM",
    CaudateLeft => "CIFTI_STRUCTURE_CAUDATE_LEFT",
    CaudateRight => "CIFTI_STRUCTURE_CAUDATE_RIGHT",
    CerebellarWhiteMatterLeft => "CIFTI_STRUCTURE_CEREBELLAR_WHITE_MATTER_LEFT",
    CerebellarWhiteMatterRight => "CIFTI_STRUCTURE_CEREBELLAR_WHITE_MATTER_RIGHT",
    Cerebellum => "CIFTI_STRUCTURE_CEREBELLUM",
    CerebellumLeft => "CIFTI_STRUCTURE_CEREBELLUM_LEFT",
    CerebellumRight => "CIFTI_STRUCTURE_CEREBELLUM_RIGHT",
    CerebralWhiteMatterLeft => "CIFTI_STRUCTURE_CEREBRAL_WHITE_MATTER_LEFT",
    CerebralWhiteMatterRight => "CIFTI_STRUCTURE_CEREBRAL_WHITE_MATTER_RIGHT",
    DiencephalonVentralLeft => "CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_LEFT",
    DiencephalonVentralRight => "CIFTI_STRUCTURE_DIENCEPHALON_VENTRAL_RIGHT",
    HippocampusLeft => "CIFTI_STRUCTURE_HIPPOCAMPUS_LEFT",
    HippocampusRight => "CIFTI_STRUCTURE_HIPPOCAMPUS_RIGHT",
    Invalid => "CIFTI_STRUCTURE_INVALID",
    Other => "CIFTI_STRUCTURE_OTHER",
    OtherGreyMatter => "CIFTI_STRUCTURE_OTHER_GREY_MATTER",
    OtherWhiteMatter => "CIFTI_STRUCTURE_OTHER_WHITE_MATTER",
    PallidumLeft => "CIFTI_STRUCTURE_PALLIDUM_LEFT",
    PallidumRight => "CIFTI_STRUCTURE_PALLIDUM_RIGHT",
    PutamenLeft => "CIFTI_STRUCTURE_PUTAMEN_LEFT",
    PutamenRight => "CIFTI_STRUCTURE_PUTAMEN_RIGHT",
    ThalamusLeft => "CIFTI_STRUCTURE_THALAMUS_LEFT",
    ThalamusRight => "CIFTI_STRUCTURE_THALAMUS_RIGHT",
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for &structure in Structure::ALL {
            assert_eq!(structure.as_str().parse::<Structure>().unwrap(), structure);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "CIFTI_STRUCTURE_SPLEEN".parse::<Structure>().unwrap_err();
        assert!(err.to_string().contains("unknown structure"));
    }
}
