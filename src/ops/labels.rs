use std::collections::HashSet;

use crate::model::{Label, LabelId};

/// Labels to attach and detach to go from `current` to `wanted`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDiff {
    pub attach: Vec<LabelId>,
    pub detach: Vec<LabelId>,
}

pub fn diff_labels(current: &[LabelId], wanted: &[LabelId]) -> LabelDiff {
    let have: HashSet<LabelId> = current.iter().copied().collect();
    let want: HashSet<LabelId> = wanted.iter().copied().collect();
    LabelDiff {
        attach: wanted.iter().copied().filter(|id| !have.contains(id)).collect(),
        detach: current.iter().copied().filter(|id| !want.contains(id)).collect(),
    }
}

/// Label names compare trimmed and case-insensitively
pub fn same_label_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn find_label_by_name<'a>(labels: &'a [Label], name: &str) -> Option<&'a Label> {
    labels.iter().find(|l| same_label_name(&l.name, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn label(id: LabelId, name: &str) -> Label {
        Label {
            id,
            project_id: 1,
            name: name.into(),
            color: "#FFFFFF".into(),
        }
    }

    #[test]
    fn diff_keeps_shared_labels() {
        let diff = diff_labels(&[1, 2, 3], &[3, 4, 1]);
        assert_eq!(
            diff,
            LabelDiff {
                attach: vec![4],
                detach: vec![2],
            }
        );
    }

    #[test]
    fn name_lookup_ignores_case_and_padding() {
        let labels = vec![label(1, "Backend"), label(2, "ui")];
        assert_eq!(find_label_by_name(&labels, "  backend ").map(|l| l.id), Some(1));
        assert_eq!(find_label_by_name(&labels, "UI").map(|l| l.id), Some(2));
        assert!(find_label_by_name(&labels, "docs").is_none());
    }
}
