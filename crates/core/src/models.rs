use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One line of the portfolio CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioRow {
    #[serde(rename = "Techstack")]
    pub techstack: String,
    #[serde(rename = "Links")]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub links: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub document: String,
    pub metadata: LinkMetadata,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub id: String,
    pub document: String,
    pub metadata: LinkMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionHit {
    pub id: String,
    pub document: String,
    pub metadata: LinkMetadata,
    /// Cosine distance, lower is closer.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMatches {
    pub skill: String,
    pub links: Vec<LinkMetadata>,
}

pub fn flatten_links(matches: &[SkillMatches]) -> Vec<LinkMetadata> {
    matches
        .iter()
        .flat_map(|item| item.links.iter().cloned())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    InMemory,
    Persistent,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => f.write_str("in-memory"),
            Self::Persistent => f.write_str("persistent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(usize),
    AlreadySeeded(usize),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub available: bool,
    pub mode: Option<ClientMode>,
    pub entries: usize,
    pub rows: usize,
    pub init_attempts: u32,
    pub error: Option<String>,
}

/// A job posting as extracted by the LLM chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Number(value) => value.to_string(),
            Self::Flag(value) => value.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match value {
        None => String::new(),
        Some(OneOrMany::One(scalar)) => scalar.into_string(),
        Some(OneOrMany::Many(items)) => items
            .into_iter()
            .map(Scalar::into_string)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    let skills = match value {
        None => Vec::new(),
        Some(OneOrMany::One(scalar)) => scalar
            .into_string()
            .split(',')
            .map(|skill| skill.trim().to_string())
            .collect(),
        Some(OneOrMany::Many(items)) => items
            .into_iter()
            .map(|item| item.into_string().trim().to_string())
            .collect(),
    };

    Ok(skills.into_iter().filter(|skill| !skill.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_posting_accepts_numeric_experience_and_skill_string() {
        let job: JobPosting = serde_json::from_str(
            r#"{"role": "Backend Engineer", "experience": 5, "skills": "Rust, Postgres ,", "description": "Build APIs"}"#,
        )
        .expect("job should parse");

        assert_eq!(job.experience, "5");
        assert_eq!(job.skills, vec!["Rust".to_string(), "Postgres".to_string()]);
    }

    #[test]
    fn job_posting_defaults_missing_and_null_fields() {
        let job: JobPosting =
            serde_json::from_str(r#"{"role": "SRE", "experience": null}"#).expect("job should parse");

        assert_eq!(job.role, "SRE");
        assert!(job.experience.is_empty());
        assert!(job.skills.is_empty());
        assert!(job.description.is_empty());
    }

    #[test]
    fn flatten_links_keeps_skill_order() {
        let matches = vec![
            SkillMatches {
                skill: "Python".to_string(),
                links: vec![LinkMetadata {
                    links: "a".to_string(),
                }],
            },
            SkillMatches {
                skill: "React".to_string(),
                links: vec![LinkMetadata {
                    links: "b".to_string(),
                }],
            },
        ];

        let links = flatten_links(&matches);
        assert_eq!(links[0].links, "a");
        assert_eq!(links[1].links, "b");
    }
}
