
use crate::{
    error::*,
    model::{IssueKey, RawIssue},
    store::TicketStore,
};

use std::collections::HashMap;

/// Breadcrumb segments at or beyond this many characters are dropped;
/// they are almost always prose that leaked a stray colon, not a
/// folder name.
pub const MAX_SEGMENT_CHARS: usize = 50;

/// Post-processes the derived breadcrumb segments, e.g. to prepend a
/// project identifier.
pub type SegmentHook = Box<dyn Fn(Vec<String>) -> Vec<String>>;

/// Maps issue identifiers to stable synthetic file paths.
///
/// The path is a pure function of the issue's stored summary and type,
/// which do not change within a run, so results are memoized per
/// identifier for the process lifetime.
pub struct PathDeriver<'a> {
    store: &'a TicketStore,
    memo: HashMap<IssueKey, String>,
    hook: Option<SegmentHook>,
}

impl<'a> PathDeriver<'a> {
    pub fn new(store: &'a TicketStore) -> Self {
        PathDeriver {
            store,
            memo: HashMap::new(),
            hook: None,
        }
    }

    pub fn with_hook(store: &'a TicketStore, hook: SegmentHook) -> Self {
        PathDeriver {
            store,
            memo: HashMap::new(),
            hook: Some(hook),
        }
    }

    /// Derive the synthetic file path for a stored issue.
    pub fn derive(&mut self, key: &IssueKey) -> Result<String> {
        if let Some(path) = self.memo.get(key) {
            return Ok(path.clone());
        }
        let ticket = self.store.get(key)
            .ok_or_else(|| ErrorKind::UnknownIssue(key.to_string()))?;
        let path = derive_path(key, &ticket.source, self.hook.as_ref());
        self.memo.insert(key.clone(), path.clone());
        Ok(path)
    }
}

fn derive_path(
    key: &IssueKey,
    issue: &RawIssue,
    hook: Option<&SegmentHook>,
) -> String {
    let extension = issue.fields.issue_type.as_ref()
        .map(|ty| ty.name.replace(' ', ""))
        .filter(|name| !name.is_empty())
        .map(|name| format!(".{}", name))
        .unwrap_or_default();

    let mut raw_segments: Vec<&str> = issue.fields.summary.split(':').collect();
    // the final segment describes the leaf, not a folder
    raw_segments.pop();
    let mut segments: Vec<String> = raw_segments.into_iter()
        .map(|segment| title_case(segment.trim()))
        .filter(|segment| !segment.is_empty())
        .filter(|segment| segment.chars().count() < MAX_SEGMENT_CHARS)
        .collect();
    if let Some(hook) = hook {
        segments = hook(segments);
    }

    let folder = if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    };
    format!("{}{}{}", folder, key, extension)
}

/// Uppercase the first letter of each word, leaving the rest alone so
/// acronyms survive.
fn title_case(segment: &str) -> String {
    segment.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::raw_issue;

    use tempfile::TempDir;

    fn store_with(
        issues: &[(&IssueKey, &str, Option<&str>)],
    ) -> (TempDir, TicketStore) {
        let dir = TempDir::new().unwrap();
        let mut store = TicketStore::open(dir.path(), "PROJ").unwrap();
        for &(key, summary, issue_type) in issues {
            store.insert_pending(
                key.clone(),
                raw_issue(&key.to_string(), summary, issue_type, &[]),
            );
            store.get_mut(key).unwrap().downloaded = true;
        }
        (dir, store)
    }

    #[test]
    fn breadcrumb_folders_from_the_summary() {
        let key = IssueKey::new("PROJ", 1);
        let (_dir, store) =
            store_with(&[(&key, "Infra: Backend: Fix bug", Some("Bug"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&key).unwrap(), "Infra/Backend/PROJ-1.Bug");
    }

    #[test]
    fn no_colon_means_no_folder() {
        let key = IssueKey::new("PROJ", 2);
        let (_dir, store) = store_with(&[(&key, "Fix bug", Some("Task"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&key).unwrap(), "PROJ-2.Task");
    }

    #[test]
    fn type_spaces_collapse_in_the_extension() {
        let key = IssueKey::new("PROJ", 3);
        let (_dir, store) =
            store_with(&[(&key, "Fix bug", Some("New Feature"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&key).unwrap(), "PROJ-3.NewFeature");
    }

    #[test]
    fn absent_or_blank_type_means_no_extension() {
        let absent = IssueKey::new("PROJ", 4);
        let blank = IssueKey::new("PROJ", 5);
        let (_dir, store) = store_with(&[
            (&absent, "Fix bug", None),
            (&blank, "Fix bug", Some("")),
        ]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&absent).unwrap(), "PROJ-4");
        assert_eq!(paths.derive(&blank).unwrap(), "PROJ-5");
    }

    #[test]
    fn segments_trim_and_title_case() {
        let key = IssueKey::new("PROJ", 6);
        let (_dir, store) =
            store_with(&[(&key, " infra team :  backend : fix", Some("Bug"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(
            paths.derive(&key).unwrap(),
            "Infra Team/Backend/PROJ-6.Bug",
        );
    }

    #[test]
    fn pathologically_long_segments_drop_out() {
        let key = IssueKey::new("PROJ", 7);
        let long = "x".repeat(50);
        let summary = format!("Infra: {}: fix", long);
        let (_dir, store) = store_with(&[(&key, summary.as_str(), Some("Bug"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&key).unwrap(), "Infra/PROJ-7.Bug");
    }

    #[test]
    fn empty_segments_drop_out() {
        let key = IssueKey::new("PROJ", 8);
        let (_dir, store) =
            store_with(&[(&key, "Infra:: fix", Some("Bug"))]);
        let mut paths = PathDeriver::new(&store);
        assert_eq!(paths.derive(&key).unwrap(), "Infra/PROJ-8.Bug");
    }

    #[test]
    fn hook_post_processes_the_breadcrumb() {
        let key = IssueKey::new("PROJ", 9);
        let (_dir, store) =
            store_with(&[(&key, "Backend: fix", Some("Bug"))]);
        let mut paths = PathDeriver::with_hook(
            &store,
            Box::new(|mut segments| {
                segments.insert(0, "PROJ".to_owned());
                segments
            }),
        );
        assert_eq!(paths.derive(&key).unwrap(), "PROJ/Backend/PROJ-9.Bug");
    }

    #[test]
    fn derivation_is_deterministic_and_memoized() {
        let key = IssueKey::new("PROJ", 10);
        let (_dir, store) =
            store_with(&[(&key, "Infra: fix", Some("Bug"))]);
        let mut paths = PathDeriver::new(&store);
        let first = paths.derive(&key).unwrap();
        let second = paths.derive(&key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_issue_is_an_error() {
        let (_dir, store) = store_with(&[]);
        let mut paths = PathDeriver::new(&store);
        match paths.derive(&IssueKey::new("PROJ", 99)) {
            Err(ref err) => match *err.kind() {
                ErrorKind::UnknownIssue(_) => (),
                _ => panic!("wrong error kind"),
            },
            Ok(_) => panic!("expected an error"),
        }
    }
}
