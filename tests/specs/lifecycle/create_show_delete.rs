//! Create, show, and delete a Story through the CLI (spec §6.4).

use crate::support::Project;

fn project() -> Project {
    let temp = Project::empty();
    temp.git_init();
    temp
}

#[test]
fn create_then_show_then_delete() {
    let temp = project();

    let created = temp
        .story()
        .args(&["story", "create", "Add feature", "--description", "does a thing"])
        .passes();
    created.stdout_has("Add feature").stdout_has("[created]");

    let list = temp.story().args(&["story", "list"]).passes();
    list.stdout_has("Add feature");

    let id = list.stdout().lines().next().expect("one story in list").split_whitespace().next().expect("id column").to_string();

    let shown = temp.story().args(&["story", "show", &id]).passes();
    shown.stdout_has("does a thing");

    temp.story().args(&["story", "delete", &id]).passes().stdout_has("deleted");

    let empty = temp.story().args(&["story", "list"]).passes();
    assert!(empty.stdout().trim().is_empty(), "story list should be empty after delete, got:\n{}", empty.stdout());
}

#[test]
fn show_unknown_story_fails() {
    let temp = project();
    temp.story().args(&["story", "show", "sty-doesnotexist"]).fails();
}
