use super::common::*;
use crate::workflows::admissions::domain::{Category, FormStep};
use crate::workflows::admissions::store::SubmissionRepository;
use crate::workflows::admissions::view::{ApplicationStage, ApplicationView};

#[test]
fn draft_and_submission_views_share_the_same_step_shape() {
    let store = store();
    let applicant = user("view-shape");
    let draft = saved_draft(
        &store,
        &applicant,
        Category::Postgraduate,
        complete_postgraduate_payload(),
    );
    let draft_view = ApplicationView::from_draft(&draft);

    let receipt = committer(store.clone())
        .submit(&applicant, Category::Postgraduate)
        .expect("submission succeeds");
    let submission = store
        .find(&receipt.application_id)
        .expect("fetch succeeds")
        .expect("submission present");
    let submission_view = ApplicationView::from_submission(&submission);

    assert_eq!(draft_view.stage, ApplicationStage::Draft);
    assert_eq!(submission_view.stage, ApplicationStage::Submission);
    // Steps are identical across lifecycle stages; callers never branch.
    assert_eq!(draft_view.steps, submission_view.steps);
    assert_eq!(submission_view.status.as_deref(), Some("submitted"));
    assert_eq!(submission_view.submitted_at, Some(submission.submitted_at));
}

#[test]
fn motivation_step_carries_work_history_and_referees_step_carries_referees() {
    let store = store();
    let applicant = user("view-children");
    let draft = saved_draft(
        &store,
        &applicant,
        Category::Postgraduate,
        complete_postgraduate_payload(),
    );

    let view = ApplicationView::from_draft(&draft);
    assert_eq!(view.steps.len(), 5);

    let motivation = view
        .steps
        .iter()
        .find(|step| step.step == FormStep::Motivation)
        .expect("motivation step present");
    assert_eq!(motivation.work_experiences.as_deref(), Some(&work_history()[..]));
    assert!(motivation.referees.is_none());

    let referees = view
        .steps
        .iter()
        .find(|step| step.step == FormStep::Referees)
        .expect("referees step present");
    assert_eq!(referees.referees.as_deref(), Some(&referees_two()[..]));
    assert!(referees.work_experiences.is_none());
}

#[test]
fn step_fields_drop_their_schema_prefix() {
    let store = store();
    let applicant = user("view-prefix");
    let draft = saved_draft(
        &store,
        &applicant,
        Category::Undergraduate,
        complete_undergraduate_payload(),
    );

    let view = ApplicationView::from_draft(&draft);
    let programme = view
        .steps
        .iter()
        .find(|step| step.step == FormStep::Programme)
        .expect("programme step present");
    assert!(programme.fields.contains_key("first_choice"));
    assert!(!programme.fields.keys().any(|key| key.contains('.')));
}
