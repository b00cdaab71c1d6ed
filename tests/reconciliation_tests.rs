// Unit tests for partial/final transcript reconciliation.
//
// The running transcript is the ordered concatenation of final segments;
// at most one in-flight partial is displayed after it and carries no
// durability.

use stepvoice::channel::TranscriptEvent;
use stepvoice::session::TranscriptReconciler;

fn partial(slice_index: u64, text: &str) -> TranscriptEvent {
    TranscriptEvent {
        slice_index,
        text: text.to_string(),
        is_final: false,
    }
}

fn fin(slice_index: u64, text: &str) -> TranscriptEvent {
    TranscriptEvent {
        slice_index,
        text: text.to_string(),
        is_final: true,
    }
}

#[test]
fn partial_replaces_previous_partial() {
    let mut reconciler = TranscriptReconciler::new();

    reconciler.apply(&partial(0, "Op"));
    reconciler.apply(&partial(0, "Open"));
    reconciler.apply(&partial(0, "Open the"));

    assert_eq!(reconciler.rendered(), "Open the");
    assert_eq!(reconciler.committed(), "");
    assert_eq!(reconciler.final_segments().len(), 0);
}

#[test]
fn final_supersedes_any_number_of_partials_for_its_slice() {
    let mut reconciler = TranscriptReconciler::new();

    // Any interleaving of partials followed by the final must leave the
    // final text and no residual fragment.
    reconciler.apply(&partial(0, "Op"));
    reconciler.apply(&partial(0, "Open th"));
    reconciler.apply(&partial(0, "Open the va"));
    reconciler.apply(&fin(0, "Open the valve"));

    assert_eq!(reconciler.rendered(), "Open the valve");
    assert_eq!(reconciler.pending_partial(), None);

    // Applying the same shape again stays clean.
    reconciler.apply(&partial(1, "slow"));
    reconciler.apply(&fin(1, "slowly"));
    assert_eq!(reconciler.rendered(), "Open the valve slowly");
    assert_eq!(reconciler.pending_partial(), None);
}

#[test]
fn valve_scenario_reconciles_in_order() {
    let mut reconciler = TranscriptReconciler::new();

    reconciler.apply(&fin(0, "Open the"));
    reconciler.apply(&fin(1, "valve slowly"));
    reconciler.apply(&partial(2, "and che"));

    assert_eq!(reconciler.rendered(), "Open the valve slowly and che");
    assert_eq!(reconciler.committed(), "Open the valve slowly");

    // After stop the trailing final lands.
    reconciler.apply(&fin(2, "and check the gauge"));

    assert_eq!(
        reconciler.rendered(),
        "Open the valve slowly and check the gauge"
    );
    assert_eq!(reconciler.pending_partial(), None);
    assert_eq!(reconciler.final_segments().len(), 3);
}

#[test]
fn final_clears_only_partials_at_or_before_its_slice() {
    let mut reconciler = TranscriptReconciler::new();

    // A partial for a later slice survives a final for an earlier one.
    reconciler.apply(&partial(3, "and then"));
    reconciler.apply(&fin(2, "check the gauge"));

    assert_eq!(reconciler.pending_partial(), Some("and then"));
    assert_eq!(reconciler.rendered(), "check the gauge and then");

    // The final for its own slice clears it.
    reconciler.apply(&fin(3, "and then close it"));
    assert_eq!(reconciler.pending_partial(), None);
    assert_eq!(reconciler.rendered(), "check the gauge and then close it");
}

#[test]
fn partial_alone_renders_without_leading_space() {
    let mut reconciler = TranscriptReconciler::new();
    reconciler.apply(&partial(0, "hello"));
    assert_eq!(reconciler.rendered(), "hello");
}

#[test]
fn clear_empties_everything() {
    let mut reconciler = TranscriptReconciler::new();
    reconciler.apply(&fin(0, "Open the valve"));
    reconciler.apply(&partial(1, "slow"));

    reconciler.clear();

    assert_eq!(reconciler.rendered(), "");
    assert_eq!(reconciler.final_segments().len(), 0);
    assert_eq!(reconciler.pending_partial(), None);
}
