//! Structured limit violations
//!
//! A [`ViolationSet`] collects every exceeded dimension instead of stopping
//! at the first one. Emission order is not part of the contract; compare
//! with [`ViolationSet::sorted`] when order matters.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};
use crate::limit::Limit;

/// Violation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    /// More devices than the policy allows
    DeviceLimitReached,
    /// More instances of one type than the policy allows
    InstanceLimitReached,
    /// More members than the policy allows
    MemberLimitReached,
}

impl ViolationCode {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceLimitReached => "device_limit_reached",
            Self::InstanceLimitReached => "instance_limit_reached",
            Self::MemberLimitReached => "member_limit_reached",
        }
    }
}

/// One exceeded dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// What was exceeded
    pub code: ViolationCode,
    /// Limit in the candidate policy
    pub limit: u64,
    /// Live count
    pub count: u64,
    /// External id of the instance type, for instance violations
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

/// Accumulates violations
#[derive(Debug, Clone, Default)]
pub struct ViolationSet {
    violations: Vec<Violation>,
}

impl ViolationSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation when `count` exceeds `limit`
    pub fn check(&mut self, code: ViolationCode, limit: Limit, count: u64) -> &mut Self {
        self.check_typed(code, limit, count, None)
    }

    /// Record an instance-type violation when `count` exceeds `limit`
    pub fn check_instance(&mut self, instance_type: &str, limit: Limit, count: u64) -> &mut Self {
        self.check_typed(
            ViolationCode::InstanceLimitReached,
            limit,
            count,
            Some(instance_type.to_string()),
        )
    }

    fn check_typed(
        &mut self,
        code: ViolationCode,
        limit: Limit,
        count: u64,
        instance_type: Option<String>,
    ) -> &mut Self {
        if let Limit::Bounded(bound) = limit {
            if count > bound {
                self.violations.push(Violation {
                    code,
                    limit: bound,
                    count,
                    instance_type,
                });
            }
        }
        self
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when nothing was exceeded
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations ordered by code, then instance type
    pub fn sorted(&self) -> Vec<Violation> {
        let mut sorted = self.violations.clone();
        sorted.sort_by(|a, b| {
            a.code
                .cmp(&b.code)
                .then_with(|| a.instance_type.cmp(&b.instance_type))
        });
        sorted
    }

    /// `Ok` when empty, otherwise `InvalidRequest` carrying every violation, sorted
    pub fn into_result(self) -> ForgeResult<()> {
        if self.violations.is_empty() {
            return Ok(());
        }
        Err(ForgeError::InvalidRequest {
            code: "invalid_request".into(),
            message: format!("team type change blocked by {} limit(s)", self.violations.len()),
            errors: self.sorted(),
        })
    }
}
