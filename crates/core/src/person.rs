//! Resolved person records.

use crate::config::AttributeNames;
use crate::directory::DirectoryRecord;
use crate::errors::LookupError;

/// A directory entry reduced to the fields the reports need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub identifier: String,
    /// Nickname when the entry has one, otherwise the display first name.
    pub first_name: String,
    pub last_name: String,
    pub mail: String,
}

impl Person {
    /// Extract a [`Person`] from `record`.
    ///
    /// Mail and last name are required. The nickname is preferred over the
    /// display first name; an empty nickname counts as absent.
    pub fn from_record(
        identifier: &str,
        record: &DirectoryRecord,
        attributes: &AttributeNames,
    ) -> Result<Self, LookupError> {
        let mail = required(record, &attributes.mail)?;
        let first_name = match optional(record, &attributes.nickname) {
            Some(nickname) => nickname,
            None => required(record, &attributes.first_name)?,
        };
        let last_name = required(record, &attributes.last_name)?;

        Ok(Self {
            identifier: identifier.to_string(),
            first_name,
            last_name,
            mail,
        })
    }

    /// `Lastname Firstname-identifier`, without a line terminator.
    pub fn name_line(&self) -> String {
        format!("{} {}-{}", self.last_name, self.first_name, self.identifier)
    }
}

fn optional(record: &DirectoryRecord, attribute: &str) -> Option<String> {
    record
        .first(attribute)
        .map(str::trim_end)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(record: &DirectoryRecord, attribute: &str) -> Result<String, LookupError> {
    record
        .first(attribute)
        .map(|v| v.trim_end().to_string())
        .ok_or_else(|| LookupError::MissingAttribute {
            attribute: attribute.to_string(),
        })
}
