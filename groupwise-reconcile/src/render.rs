//! Change tables for confirming an edit

use crate::diff::ChangeSummary;
use crate::session::ChangeReview;
use groupwise_core::ChangeView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
}

/// One line of the change table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    /// Entity label, set on the first row of each entity only
    pub label: Option<String>,
    pub item: String,
    pub kind: ChangeKind,
}

impl ChangeRow {
    pub fn item_cell(&self) -> String {
        match self.kind {
            ChangeKind::Added => format!("+ {}", self.item),
            ChangeKind::Removed => format!("- {}", self.item),
        }
    }
}

/// Build rows from a summary; additions come before removals for each entity
///
/// In the user view, the entry whose display name equals `auth_user_name` is
/// labelled `(YOU)`.
pub fn change_rows(
    summary: &ChangeSummary,
    view: ChangeView,
    auth_user_name: Option<&str>,
) -> Vec<ChangeRow> {
    let mut rows = Vec::new();

    for (_, entry) in summary.iter() {
        let is_you = view == ChangeView::User && Some(entry.name.as_str()) == auth_user_name;
        let mut label = if is_you {
            Some(format!("{} (YOU)", entry.name))
        } else {
            Some(entry.name.clone())
        };

        let changes = entry
            .added
            .iter()
            .map(|item| (item, ChangeKind::Added))
            .chain(entry.removed.iter().map(|item| (item, ChangeKind::Removed)));

        for (item, kind) in changes {
            rows.push(ChangeRow {
                label: label.take(),
                item: item.clone(),
                kind,
            });
        }
    }

    rows
}

fn headers(view: ChangeView) -> (&'static str, &'static str) {
    match view {
        ChangeView::User => ("User", "Group"),
        ChangeView::Group => ("Group", "User"),
    }
}

/// Render the review as a two-column plain-text table
pub fn render_table(
    review: &ChangeReview,
    view: ChangeView,
    auth_user_name: Option<&str>,
) -> String {
    let summary = match view {
        ChangeView::User => &review.by_identity,
        ChangeView::Group => &review.by_group,
    };
    let rows = change_rows(summary, view, auth_user_name);
    let (left, right) = headers(view);

    let width = rows
        .iter()
        .filter_map(|row| row.label.as_ref().map(|label| label.chars().count()))
        .chain(std::iter::once(left.len()))
        .max()
        .unwrap_or(left.len());

    let mut out = format!("{:<width$}  {}\n", left, right, width = width);
    for row in &rows {
        let label = row.label.as_deref().unwrap_or("");
        out.push_str(&format!(
            "{:<width$}  {}\n",
            label,
            row.item_cell(),
            width = width
        ));
    }

    out
}
