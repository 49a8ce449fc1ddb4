//! `story list --status` filtering (spec §6.4).

use crate::support::Project;

#[test]
fn list_filters_by_status() {
    let temp = Project::empty();
    temp.git_init();

    temp.story().args(&["story", "create", "First", "--description", "one"]).passes();
    temp.story().args(&["story", "create", "Second", "--description", "two"]).passes();

    let created = temp.story().args(&["story", "list", "--status", "created"]).passes();
    assert_eq!(created.stdout().lines().count(), 2, "both stories are still Created:\n{}", created.stdout());

    let planned = temp.story().args(&["story", "list", "--status", "planned"]).passes();
    assert!(planned.stdout().trim().is_empty(), "no story has reached Planned yet:\n{}", planned.stdout());
}
