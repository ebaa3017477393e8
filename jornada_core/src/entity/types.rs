use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Kind of a curriculum step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "link")]
    Link,
    #[sea_orm(string_value = "video")]
    Video,
    #[sea_orm(string_value = "activity")]
    Activity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum AppRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "user")]
    User,
}

/// Free-form labels, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Tags(pub Vec<String>);

impl Tags {
    /// Trims every tag and drops the empty ones, keeping first-seen order.
    pub fn normalized<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = Vec::new();
        for tag in raw {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Tags(tags)
    }

    /// Splits a comma separated form value ("rust, web,  ") into tags.
    pub fn from_csv(csv: &str) -> Self {
        Self::normalized(csv.split(','))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_tags_are_trimmed_and_deduplicated() {
        let tags = Tags::from_csv(" rust,web ,, rust ,  ");
        assert_eq!(tags.as_slice(), &["rust".to_string(), "web".to_string()]);
        assert!(Tags::from_csv("").as_slice().is_empty());
    }

    #[test]
    fn content_type_uses_lowercase_names() {
        let json = serde_json::to_string(&ContentType::Activity).unwrap();
        assert_eq!(json, "\"activity\"");
        let role: AppRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, AppRole::Admin);
    }
}
