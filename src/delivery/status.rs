use std::collections::BTreeSet;

use reqwest::StatusCode;

/// Status codes that count as a successful delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SuccessSet {
    /// Any 2xx status.
    #[default]
    AnySuccess,
    /// Only the listed codes.
    Codes(BTreeSet<u16>),
}

impl SuccessSet {
    /// Builds an explicit set from raw status codes.
    pub fn codes(codes: impl IntoIterator<Item = u16>) -> Self {
        SuccessSet::Codes(codes.into_iter().collect())
    }

    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            SuccessSet::AnySuccess => status.is_success(),
            SuccessSet::Codes(codes) => codes.contains(&status.as_u16()),
        }
    }
}
