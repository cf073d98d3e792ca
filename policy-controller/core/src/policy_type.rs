use std::fmt;

/// Classifies when and how a policy's rules are applied to a resource.
///
/// A single policy may be indexed under several types, one per kind of rule it declares.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyType {
    Mutate,
    ValidateEnforce,
    ValidateAudit,
    Generate,
    VerifyImagesMutate,
    VerifyImagesValidate,
}

// === impl PolicyType ===

impl PolicyType {
    pub const ALL: [PolicyType; 6] = [
        PolicyType::Mutate,
        PolicyType::ValidateEnforce,
        PolicyType::ValidateAudit,
        PolicyType::Generate,
        PolicyType::VerifyImagesMutate,
        PolicyType::VerifyImagesValidate,
    ];

    /// Returns true for the two validation types, whose results depend on a policy's effective
    /// failure action.
    #[inline]
    pub fn is_validate(self) -> bool {
        matches!(self, Self::ValidateEnforce | Self::ValidateAudit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutate => "Mutate",
            Self::ValidateEnforce => "ValidateEnforce",
            Self::ValidateAudit => "ValidateAudit",
            Self::Generate => "Generate",
            Self::VerifyImagesMutate => "VerifyImagesMutate",
            Self::VerifyImagesValidate => "VerifyImagesValidate",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
