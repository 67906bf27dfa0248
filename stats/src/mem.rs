use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    strum::EnumIter,
    strum::Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub enum AccessKind {
    INST_ACC_R,
    DATA_ACC_R,
    DATA_ACC_W,
}

impl AccessKind {
    #[must_use]
    pub fn is_write(self) -> bool {
        match self {
            AccessKind::INST_ACC_R | AccessKind::DATA_ACC_R => false,
            AccessKind::DATA_ACC_W => true,
        }
    }

    #[must_use]
    pub fn is_inst(self) -> bool {
        self == AccessKind::INST_ACC_R
    }
}
