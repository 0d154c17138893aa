//! Assertion namespace value objects (`urn:oasis:names:tc:SAML:2.0:assertion`).

/// A SAML name identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIdType {
    /// Name ID format URI.
    pub format: String,
    /// The identifier value.
    pub text: String,
}

impl NameIdType {
    /// Creates a name ID with the given format and value.
    #[must_use]
    pub fn new(format: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            text: text.into(),
        }
    }
}

/// Subject confirmation data of a bearer confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationDataType {
    /// ID of the request the assertion answers.
    pub in_response_to: String,
    /// End of the confirmation window.
    pub not_on_or_after: String,
    /// ACS URL the assertion must be delivered to; empty when unknown.
    pub recipient: String,
    /// Client address the assertion was issued for; empty when unknown.
    pub address: String,
}

/// A subject confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationType {
    /// Confirmation method URI.
    pub method: String,
    /// Confirmation data.
    pub subject_confirmation_data: Option<SubjectConfirmationDataType>,
}

/// An assertion subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectType {
    /// The subject's name ID.
    pub name_id: Option<NameIdType>,
    /// Subject confirmations.
    pub subject_confirmation: Vec<SubjectConfirmationType>,
}

/// An audience restriction condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudienceRestrictionType {
    /// Entity IDs allowed to consume the assertion.
    pub audience: Vec<String>,
}

/// Assertion or request conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionsType {
    /// Validity window start; empty when unbounded.
    pub not_before: String,
    /// Validity window end; empty when unbounded.
    pub not_on_or_after: String,
    /// Audience restrictions.
    pub audience_restriction: Vec<AudienceRestrictionType>,
}

/// A SAML attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeType {
    /// Attribute name.
    pub name: String,
    /// Optional human readable name.
    pub friendly_name: String,
    /// Name format URI.
    pub name_format: String,
    /// Attribute values.
    pub attribute_value: Vec<String>,
}

/// An attribute statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStatementType {
    /// Attributes asserted for the subject.
    pub attribute: Vec<AttributeType>,
}

/// The authentication context of an authn statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnContextType {
    /// Authentication context class reference URI.
    pub authn_context_class_ref: String,
}

/// An authentication statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnStatementType {
    /// Instant the subject authenticated.
    pub authn_instant: String,
    /// Session index, equal to the assertion ID.
    pub session_index: String,
    /// Authentication context.
    pub authn_context: AuthnContextType,
}

/// A SAML assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionType {
    /// Assertion ID.
    pub id: String,
    /// SAML version, always `2.0`.
    pub version: String,
    /// Issue instant.
    pub issue_instant: String,
    /// Issuing entity.
    pub issuer: NameIdType,
    /// Subject of the assertion.
    pub subject: Option<SubjectType>,
    /// Conditions on assertion validity.
    pub conditions: Option<ConditionsType>,
    /// Attribute statements.
    pub attribute_statement: Vec<AttributeStatementType>,
    /// Authentication statements.
    pub authn_statement: Vec<AuthnStatementType>,
}
