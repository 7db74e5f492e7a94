/// The tracking-tool item a branch is created for, as handed over by the
/// tracking tool when the flow starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: u64,
    pub subtype: String,
    pub name: String,
    pub shared_space_id: u64,
    pub workspace_id: u64,
}

impl WorkItem {
    /// Entity type used both for branch-pattern lookup and as the default
    /// branch prefix.
    pub fn pattern_entity_type(&self) -> &str {
        pattern_entity_type(&self.subtype)
    }
}

pub fn pattern_entity_type(subtype: &str) -> &str {
    match subtype {
        "story" => "user_story",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(subtype: &str) -> WorkItem {
        WorkItem {
            id: 1,
            subtype: subtype.to_string(),
            name: "n".to_string(),
            shared_space_id: 1001,
            workspace_id: 1002,
        }
    }

    #[test]
    fn maps_story_to_user_story() {
        assert_eq!(item("story").pattern_entity_type(), "user_story");
    }

    #[test]
    fn keeps_other_subtypes() {
        assert_eq!(item("defect").pattern_entity_type(), "defect");
        assert_eq!(item("quality_story").pattern_entity_type(), "quality_story");
    }
}
