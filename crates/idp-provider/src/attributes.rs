//! Subject attributes and their SAML projection.

use std::collections::BTreeMap;

use idp_xml::constants::{ATTRIBUTE_NAME_FORMAT_BASIC, NAMEID_FORMAT_EMAIL};
use idp_xml::saml::{AttributeType, NameIdType};

/// A custom attribute beyond the built-in fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomAttribute {
    /// Human readable name.
    pub friendly_name: String,
    /// Name format URI.
    pub name_format: String,
    /// Attribute values.
    pub attribute_value: Vec<String>,
}

/// The attributes asserted for a subject.
///
/// Storage fills this container when resolving userinfo; the response
/// builder projects it into SAML attributes.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    email: String,
    full_name: String,
    given_name: String,
    surname: String,
    user_id: String,
    username: String,
    // BTreeMap keeps the custom attribute projection in a stable
    // lexicographic order.
    custom_attributes: BTreeMap<String, CustomAttribute>,
}

impl Attributes {
    /// Sets the email address.
    pub fn set_email(&mut self, value: impl Into<String>) {
        self.email = value.into();
    }

    /// Sets the full name.
    pub fn set_full_name(&mut self, value: impl Into<String>) {
        self.full_name = value.into();
    }

    /// Sets the given name.
    pub fn set_given_name(&mut self, value: impl Into<String>) {
        self.given_name = value.into();
    }

    /// Sets the surname.
    pub fn set_surname(&mut self, value: impl Into<String>) {
        self.surname = value.into();
    }

    /// Sets the user ID.
    pub fn set_user_id(&mut self, value: impl Into<String>) {
        self.user_id = value.into();
    }

    /// Sets the username.
    pub fn set_username(&mut self, value: impl Into<String>) {
        self.username = value.into();
    }

    /// Sets a custom attribute, replacing a previous value under the same
    /// name.
    pub fn set_custom_attribute(
        &mut self,
        name: impl Into<String>,
        friendly_name: impl Into<String>,
        name_format: impl Into<String>,
        attribute_value: Vec<String>,
    ) {
        self.custom_attributes.insert(
            name.into(),
            CustomAttribute {
                friendly_name: friendly_name.into(),
                name_format: name_format.into(),
                attribute_value,
            },
        );
    }

    /// The subject name ID: email address format, carrying the username.
    #[must_use]
    pub fn get_name_id(&self) -> NameIdType {
        NameIdType::new(NAMEID_FORMAT_EMAIL, self.username.clone())
    }

    /// Projects the attributes into SAML attribute elements.
    ///
    /// Built-in fields come first, in a fixed order, skipping empty values;
    /// custom attributes follow sorted by name.
    #[must_use]
    pub fn get_saml(&self) -> Vec<AttributeType> {
        let built_in = [
            ("Email", &self.email),
            ("SurName", &self.surname),
            ("FirstName", &self.given_name),
            ("FullName", &self.full_name),
            ("UserName", &self.username),
            ("UserID", &self.user_id),
        ];

        let mut attrs = Vec::new();
        for (name, value) in built_in {
            if value.is_empty() {
                continue;
            }
            attrs.push(AttributeType {
                name: name.to_string(),
                friendly_name: String::new(),
                name_format: ATTRIBUTE_NAME_FORMAT_BASIC.to_string(),
                attribute_value: vec![value.clone()],
            });
        }
        for (name, custom) in &self.custom_attributes {
            attrs.push(AttributeType {
                name: name.clone(),
                friendly_name: custom.friendly_name.clone(),
                name_format: custom.name_format.clone(),
                attribute_value: custom.attribute_value.clone(),
            });
        }
        attrs
    }
}
