//! `story verify` against a plain directory (spec §6.4, §A.6).

use crate::support::Project;

#[test]
fn verify_with_no_detectable_projects_passes_trivially() {
    let temp = Project::empty();
    temp.git_init();

    temp.story().args(&["verify", temp.path().to_str().expect("utf8 path")]).passes().stdout_has("No verification steps detected");
}
