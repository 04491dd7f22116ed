use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::{
    AdmissionStatus, CoeStatus, CourseStatus, InterviewStatus, StatusField, VisaStatus,
};

/// What to do with a status value outside its allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPolicy {
    /// Replace the value with the field's default.
    #[default]
    Substitute,
    /// Reject the whole payload.
    Strict,
}

impl EnumPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "substitute" | "default" => Some(Self::Substitute),
            "strict" | "reject" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// One row of the normalization table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
    pub default: &'static str,
}

impl FieldRule {
    pub fn for_status<T: StatusField>() -> Self {
        Self {
            field: T::FIELD,
            allowed: T::ALLOWED,
            default: T::default().label(),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        value
            .as_str()
            .map_or(false, |raw| self.allowed.contains(&raw))
    }
}

/// Record of a value replaced under [`EnumPolicy::Substitute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substitution {
    pub field: &'static str,
    pub rejected: Value,
    pub replacement: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedField {
    pub field: &'static str,
    pub value: Value,
    pub allowed: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("invalid value for {}", field_list(.0))]
    Rejected(Vec<RejectedField>),
}

fn field_list(fields: &[RejectedField]) -> String {
    fields
        .iter()
        .map(|rejected| format!("{} (allowed: {})", rejected.field, rejected.allowed.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Clamps status-like fields of a proposed record to their allowed sets.
///
/// Fields are checked independently. A field that is absent or `null` is left
/// alone so partial updates keep the stored value.
#[derive(Debug, Clone)]
pub struct EnumNormalizer {
    rules: Vec<FieldRule>,
    policy: EnumPolicy,
}

impl EnumNormalizer {
    pub fn new(rules: Vec<FieldRule>, policy: EnumPolicy) -> Self {
        Self { rules, policy }
    }

    /// Table covering every status field a student carries.
    pub fn for_students(policy: EnumPolicy) -> Self {
        Self::new(
            vec![
                FieldRule::for_status::<CoeStatus>(),
                FieldRule::for_status::<VisaStatus>(),
                FieldRule::for_status::<AdmissionStatus>(),
                FieldRule::for_status::<CourseStatus>(),
                FieldRule::for_status::<InterviewStatus>(),
            ],
            policy,
        )
    }

    pub fn policy(&self) -> EnumPolicy {
        self.policy
    }

    pub fn normalize(
        &self,
        record: &mut Map<String, Value>,
    ) -> Result<Vec<Substitution>, NormalizationError> {
        let mut substitutions = Vec::new();
        let mut rejected = Vec::new();

        for rule in &self.rules {
            let Some(value) = record.get_mut(rule.field) else {
                continue;
            };
            if value.is_null() || rule.accepts(value) {
                continue;
            }

            match self.policy {
                EnumPolicy::Substitute => {
                    let previous =
                        std::mem::replace(value, Value::String(rule.default.to_string()));
                    substitutions.push(Substitution {
                        field: rule.field,
                        rejected: previous,
                        replacement: rule.default,
                    });
                }
                EnumPolicy::Strict => rejected.push(RejectedField {
                    field: rule.field,
                    value: value.clone(),
                    allowed: rule.allowed,
                }),
            }
        }

        if rejected.is_empty() {
            Ok(substitutions)
        } else {
            Err(NormalizationError::Rejected(rejected))
        }
    }
}
