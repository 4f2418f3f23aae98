use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Tracker {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Priority {
    pub id: u32,
    pub name: String,
}

/// Form reference data loaded from the remote tracker.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub projects: Vec<Project>,
    pub trackers: Vec<Tracker>,
    pub priorities: Vec<Priority>,
}

impl ReferenceData {
    /// Resolves user input to a project: a numeric id, an exact name
    /// (case-insensitive), or a substring that matches exactly one project.
    pub fn resolve_project(&self, input: &str) -> Option<&Project> {
        let needle = input.trim();
        if needle.is_empty() {
            return None;
        }

        if let Ok(id) = needle.parse::<u32>() {
            if let Some(project) = self.projects.iter().find(|p| p.id == id) {
                return Some(project);
            }
        }

        if let Some(project) = self
            .projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(needle))
        {
            return Some(project);
        }

        let lowered = needle.to_lowercase();
        let mut matches = self
            .projects
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&lowered));
        match (matches.next(), matches.next()) {
            (Some(project), None) => Some(project),
            _ => None,
        }
    }

    /// The support tracker when one exists, otherwise the first tracker.
    pub fn default_tracker(&self) -> Option<&Tracker> {
        self.trackers
            .iter()
            .find(|tracker| {
                let name = tracker.name.to_lowercase();
                name.contains("support") || name.contains("soporte")
            })
            .or_else(|| self.trackers.first())
    }

    /// The "normal" priority when one exists, otherwise the middle entry.
    pub fn default_priority(&self) -> Option<&Priority> {
        self.priorities
            .iter()
            .find(|priority| priority.name.to_lowercase().contains("normal"))
            .or_else(|| self.priorities.get(self.priorities.len() / 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceData {
        ReferenceData {
            projects: vec![
                Project {
                    id: 3,
                    name: "Payments".to_string(),
                },
                Project {
                    id: 7,
                    name: "Payroll".to_string(),
                },
            ],
            trackers: vec![
                Tracker {
                    id: 1,
                    name: "Bug".to_string(),
                },
                Tracker {
                    id: 2,
                    name: "Soporte".to_string(),
                },
            ],
            priorities: vec![
                Priority {
                    id: 1,
                    name: "Baja".to_string(),
                },
                Priority {
                    id: 2,
                    name: "Normal".to_string(),
                },
                Priority {
                    id: 3,
                    name: "Alta".to_string(),
                },
            ],
        }
    }

    #[test]
    fn resolves_project_by_id() {
        let data = reference();
        assert_eq!(data.resolve_project("3").map(|p| p.id), Some(3));
    }

    #[test]
    fn resolves_project_by_exact_name_ignoring_case() {
        let data = reference();
        assert_eq!(data.resolve_project("payments").map(|p| p.id), Some(3));
    }

    #[test]
    fn resolves_project_by_unique_substring() {
        let data = reference();
        assert_eq!(data.resolve_project("ment").map(|p| p.id), Some(3));
        // "pay" matches both projects.
        assert!(data.resolve_project("pay").is_none());
    }

    #[test]
    fn rejects_unknown_and_empty_project_input() {
        let data = reference();
        assert!(data.resolve_project("inventory").is_none());
        assert!(data.resolve_project("  ").is_none());
        assert!(data.resolve_project("99").is_none());
    }

    #[test]
    fn prefers_support_tracker() {
        let data = reference();
        assert_eq!(data.default_tracker().map(|t| t.id), Some(2));
    }

    #[test]
    fn falls_back_to_first_tracker() {
        let mut data = reference();
        data.trackers[1].name = "Feature".to_string();
        assert_eq!(data.default_tracker().map(|t| t.id), Some(1));
    }

    #[test]
    fn prefers_normal_priority_with_middle_fallback() {
        let data = reference();
        assert_eq!(data.default_priority().map(|p| p.id), Some(2));

        let mut renamed = reference();
        for priority in &mut renamed.priorities {
            priority.name = format!("P{}", priority.id);
        }
        // Middle of three entries.
        assert_eq!(renamed.default_priority().map(|p| p.id), Some(2));
    }
}
