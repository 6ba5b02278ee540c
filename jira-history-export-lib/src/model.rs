
use crate::error::*;

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Serialization format of the tracker's changelog timestamps,
/// e.g. `2006-12-18T10:15:30.000+0000`.
const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parse a tracker timestamp to an absolute instant.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    Ok(DateTime::parse_from_str(raw, TIMESTAMP_FORMAT)?)
}

/// Identifying information for a tracked issue: project key plus
/// sequence number.
///
/// Ordering is by project, then numerically by sequence number, so
/// `PROJ-2` sorts before `PROJ-10`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct IssueKey {
    pub project: String,
    pub number: u32,
}

impl IssueKey {
    pub fn new<S: ToString>(project: S, number: u32) -> Self {
        IssueKey {
            project: project.to_string(),
            number,
        }
    }
}

impl Display for IssueKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.number)
    }
}

impl FromStr for IssueKey {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.rsplitn(2, '-');
        let number = parts.next();
        let project = parts.next();
        match (project, number) {
            (Some(project), Some(number)) if !project.is_empty() => {
                let number = number.parse::<u32>()
                    .chain_err(|| ErrorKind::BadIssueKey(raw.to_owned()))?;
                Ok(IssueKey::new(project, number))
            }
            _ => Err(ErrorKind::BadIssueKey(raw.to_owned()).into()),
        }
    }
}

// an issue key serializes as its display form so it can key the store's
// JSON object

impl serde::Serialize for IssueKey {
    fn serialize<S>(&self, s: S) -> ::std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for IssueKey {
    fn deserialize<D>(d: D) -> ::std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <String as serde::Deserialize>::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The consumed projection of one tracker issue record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub changelog: Changelog,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fields {
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "issuetype", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueType {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<HistoryEntry>,
}

/// One recorded change event on a tracked issue.
///
/// Immutable once stored; the raw timestamp stays in the tracker's
/// serialization and parses on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub created: String,
    pub author: Author,
}

impl HistoryEntry {
    pub fn created_at(&self) -> Result<DateTime<FixedOffset>> {
        parse_timestamp(&self.created)
    }

    /// Calendar date of the change, local to the tracker's offset.
    pub fn created_date(&self) -> Result<NaiveDate> {
        Ok(self.created_at()?.date_naive())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "emailAddress", default)]
    pub email_address: String,
}

#[cfg(test)]
static EXAMPLE_ISSUE_JSON: &str = r#"
{
    "key": "PROJ-1",
    "fields": {
        "summary": "Infra: Backend: Fix bug",
        "issuetype": { "name": "Bug" }
    },
    "changelog": {
        "histories": [
            {
                "created": "2006-09-19T12:35:12.000+0000",
                "author": {
                    "displayName": "Alice Admin",
                    "emailAddress": "alice@example.com"
                }
            },
            {
                "created": "2006-12-18T10:15:30.000+0000",
                "author": {
                    "displayName": "Bob Builder",
                    "emailAddress": "bob@example.com"
                }
            }
        ]
    }
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parses_tracker_serialization() {
        let parsed = parse_timestamp("2006-12-18T10:15:30.000+0000").unwrap();
        assert_eq!(parsed.timestamp(), 1166436930);
        assert_eq!(
            parsed.date_naive(),
            NaiveDate::from_ymd_opt(2006, 12, 18).unwrap(),
        );
    }

    #[test]
    fn timestamp_keeps_the_offset_local_date() {
        // half past midnight UTC+10 is still the 18th locally
        let parsed = parse_timestamp("2006-12-18T00:30:00.000+1000").unwrap();
        assert_eq!(
            parsed.date_naive(),
            NaiveDate::from_ymd_opt(2006, 12, 18).unwrap(),
        );
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_timestamp("yesterday-ish").is_err());
    }

    #[test]
    fn issue_key_round_trips() {
        let key: IssueKey = "PROJ-17".parse().unwrap();
        assert_eq!(key, IssueKey::new("PROJ", 17));
        assert_eq!(key.to_string(), "PROJ-17");
    }

    #[test]
    fn issue_key_orders_numerically() {
        let two: IssueKey = "PROJ-2".parse().unwrap();
        let ten: IssueKey = "PROJ-10".parse().unwrap();
        assert!(two < ten);
    }

    #[test]
    fn issue_key_rejects_garbage() {
        assert!("PROJ".parse::<IssueKey>().is_err());
        assert!("-12".parse::<IssueKey>().is_err());
        assert!("PROJ-twelve".parse::<IssueKey>().is_err());
    }

    #[test]
    fn issue_key_serializes_as_display_string() {
        let key = IssueKey::new("PROJ", 3);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"PROJ-3\"");
        let back: IssueKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn raw_issue_deserializes_consumed_fields() {
        let issue: RawIssue =
            serde_json::from_str(super::EXAMPLE_ISSUE_JSON).unwrap();
        assert_eq!(issue.key, "PROJ-1");
        assert_eq!(issue.fields.summary, "Infra: Backend: Fix bug");
        assert_eq!(issue.fields.issue_type.as_ref().unwrap().name, "Bug");
        assert_eq!(issue.changelog.histories.len(), 2);
        assert_eq!(
            issue.changelog.histories[1].author.display_name,
            "Bob Builder",
        );
    }

    #[test]
    fn raw_issue_tolerates_absent_fields() {
        let issue: RawIssue = serde_json::from_str(r#"{"key":"PROJ-9"}"#).unwrap();
        assert_eq!(issue.fields.summary, "");
        assert!(issue.fields.issue_type.is_none());
        assert!(issue.changelog.histories.is_empty());
    }
}
