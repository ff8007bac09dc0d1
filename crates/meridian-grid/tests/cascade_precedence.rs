//! End-to-end tests of the attribute precedence chain.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use meridian_grid::paint::Color;
use meridian_grid::style::{
    AttributeCascade, AttributeController, CellProperty, PropertyValue, RecordScope,
};

fn color(v: u8) -> PropertyValue {
    Color::from_rgb8(v, v, v).into()
}

fn effective_color(cascade: &AttributeCascade, row: usize, col: usize) -> Option<Color> {
    cascade
        .cell_property(row, col, CellProperty::Background, None)
        .and_then(|v| v.as_color())
}

#[test]
fn cell_beats_column_beats_row_beats_default() {
    let cascade = AttributeCascade::new();
    let id = CellProperty::Background;

    cascade.set_default_property(id, color(1)).unwrap();
    cascade.set_row_property(0, false, id, color(2), true).unwrap();
    cascade
        .set_column_property(0, false, id, color(3), true)
        .unwrap();
    cascade.set_cell_property(0, 0, false, id, color(4)).unwrap();

    assert_eq!(effective_color(&cascade, 0, 0), Some(Color::from_rgb8(4, 4, 4)));

    cascade.clear_cell_property(0, 0, false, id);
    assert_eq!(effective_color(&cascade, 0, 0), Some(Color::from_rgb8(3, 3, 3)));

    cascade.clear_column_property(0, false, id);
    assert_eq!(effective_color(&cascade, 0, 0), Some(Color::from_rgb8(2, 2, 2)));

    cascade.clear_row_property(0, false, id);
    assert_eq!(effective_color(&cascade, 0, 0), Some(Color::from_rgb8(1, 1, 1)));
}

#[test]
fn visual_cell_wins_over_every_model_layer() {
    let cascade = AttributeCascade::new();
    let id = CellProperty::Background;

    cascade.set_cell_property(0, 0, false, id, color(10)).unwrap();
    cascade
        .set_row_property(0, false, id, color(11), false)
        .unwrap();
    cascade.set_cell_property(3, 3, true, id, color(12)).unwrap();

    // Model cell (0,0) is shown at visual (3,3): the visual record wins.
    assert_eq!(
        cascade
            .cell_property(0, 0, id, Some((3, 3)))
            .and_then(|v| v.as_color()),
        Some(Color::from_rgb8(12, 12, 12))
    );
}

#[test]
fn default_reset_wipes_row_column_and_cell_overrides() {
    let cascade = AttributeCascade::new();
    let id = CellProperty::Background;

    cascade.set_row_property(1, false, id, color(5), true).unwrap();
    cascade
        .set_column_property(2, false, id, color(6), true)
        .unwrap();
    cascade.set_cell_property(7, 7, false, id, color(7)).unwrap();

    cascade.set_default_property(id, color(9)).unwrap();

    let nine = Some(Color::from_rgb8(9, 9, 9));
    assert_eq!(
        cascade.row_property(1, id, None).and_then(|v| v.as_color()),
        nine
    );
    assert_eq!(
        cascade
            .column_property(2, id, None)
            .and_then(|v| v.as_color()),
        nine
    );
    assert_eq!(effective_color(&cascade, 7, 7), nine);
}

#[test]
fn repeating_pattern_matches_every_interval() {
    let cascade = AttributeCascade::new();
    let id = CellProperty::Background;

    cascade
        .set_repeating_row_property(2, 3, id, color(42))
        .unwrap();

    let striped = |visual_row: usize| {
        cascade
            .cell_property(visual_row, 0, id, Some((visual_row, 0)))
            .and_then(|v| v.as_color())
            == Some(Color::from_rgb8(42, 42, 42))
    };

    for matching in [2, 5, 8, 11] {
        assert!(striped(matching), "visual row {matching} should be striped");
    }
    for missing in [0, 1, 3, 4, 6, 7] {
        assert!(!striped(missing), "visual row {missing} should fall through");
    }
}

#[test]
fn repeating_lookup_by_exact_record() {
    let cascade = AttributeCascade::new();
    cascade
        .set_repeating_row_property(1, 2, CellProperty::Label, "odd".into())
        .unwrap();

    assert_eq!(
        cascade
            .repeating_row_property(1, 2, CellProperty::Label)
            .and_then(|v| v.as_str().map(String::from)),
        Some("odd".to_string())
    );
    // A different (start, interval) pair is a different record.
    assert!(
        cascade
            .repeating_row_property(1, 3, CellProperty::Label)
            .is_none()
    );

    cascade.clear_repeating_row_property(1, 2, CellProperty::Label);
    assert!(
        cascade
            .repeating_row_property(1, 2, CellProperty::Label)
            .is_none()
    );
}

#[test]
fn shadow_cascade_is_all_or_nothing() {
    let main = Arc::new(AttributeCascade::new());
    let id = CellProperty::Background;

    main.set_cell_property(2, 2, false, id, color(20)).unwrap();

    let header = AttributeCascade::with_shadow(main.clone());

    // Nothing local: the shadow's whole chain answers, including its
    // cell-level record.
    assert_eq!(effective_color(&header, 2, 2), Some(Color::from_rgb8(20, 20, 20)));

    // Any local answer, even the weakest layer, preempts the shadow's
    // stronger layers.
    header.set_default_property(id, color(30)).unwrap();
    assert_eq!(effective_color(&header, 2, 2), Some(Color::from_rgb8(30, 30, 30)));
}

/// A controller that manages the Background property for cells and leaves
/// everything else to record storage.
struct BackgroundController {
    cells: RwLock<std::collections::HashMap<(usize, usize), PropertyValue>>,
}

impl BackgroundController {
    fn new() -> Self {
        Self {
            cells: RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl AttributeController for BackgroundController {
    fn cell_property(&self, row: usize, col: usize, id: CellProperty) -> Option<PropertyValue> {
        if id != CellProperty::Background {
            return None;
        }
        self.cells.read().get(&(row, col)).cloned()
    }

    fn row_property(&self, _row: usize, _id: CellProperty) -> Option<PropertyValue> {
        None
    }

    fn column_property(&self, _col: usize, _id: CellProperty) -> Option<PropertyValue> {
        None
    }

    fn default_property(&self, _id: CellProperty) -> Option<PropertyValue> {
        None
    }

    fn set_cell_property(
        &self,
        row: usize,
        col: usize,
        id: CellProperty,
        value: &PropertyValue,
    ) -> bool {
        if id != CellProperty::Background {
            return false;
        }
        self.cells.write().insert((row, col), value.clone());
        true
    }

    fn set_row_property(&self, _row: usize, _id: CellProperty, _value: &PropertyValue) -> bool {
        false
    }

    fn set_column_property(&self, _col: usize, _id: CellProperty, _value: &PropertyValue) -> bool {
        false
    }

    fn set_default_property(&self, _id: CellProperty, _value: &PropertyValue) -> bool {
        false
    }

    fn clear_cell_property(&self, row: usize, col: usize, id: CellProperty) -> bool {
        if id != CellProperty::Background {
            return false;
        }
        self.cells.write().remove(&(row, col));
        true
    }

    fn clear_row_property(&self, _row: usize, _id: CellProperty) -> bool {
        false
    }

    fn clear_column_property(&self, _col: usize, _id: CellProperty) -> bool {
        false
    }

    fn is_supported(&self, id: CellProperty) -> bool {
        id == CellProperty::Background
    }
}

#[test]
fn controller_replaces_model_storage_for_its_scope() {
    let cascade = AttributeCascade::new();
    cascade.set_attribute_controller(Box::new(BackgroundController::new()), 10, 10);

    // The write is handled by the controller, not record storage.
    cascade
        .set_cell_property(1, 1, false, CellProperty::Background, color(50))
        .unwrap();
    assert_eq!(effective_color(&cascade, 1, 1), Some(Color::from_rgb8(50, 50, 50)));

    // Unsupported properties still live in the cascade's own records.
    cascade
        .set_cell_property(1, 1, false, CellProperty::Label, "mine".into())
        .unwrap();
    assert_eq!(
        cascade
            .cell_property(1, 1, CellProperty::Label, None)
            .and_then(|v| v.as_str().map(String::from)),
        Some("mine".to_string())
    );

    cascade.clear_cell_property(1, 1, false, CellProperty::Background);
    // Falls through to the default record once the controller has nothing.
    assert_eq!(
        effective_color(&cascade, 1, 1),
        cascade
            .default_property(CellProperty::Background)
            .and_then(|v| v.as_color())
    );
}

#[test]
fn notifications_report_region_and_coordinate_space() {
    let cascade = AttributeCascade::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    cascade
        .signals()
        .cell_property_changed
        .connect(move |(region, id, visual)| {
            seen_clone.lock().push((*region, *id, *visual));
        });

    cascade
        .set_cell_property(3, 4, false, CellProperty::Label, "x".into())
        .unwrap();
    cascade
        .set_row_property(5, true, CellProperty::Label, "y".into(), true)
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);

    let (region, id, visual) = seen[0];
    assert_eq!((region.start_row, region.start_col), (3, 4));
    assert_eq!(id, CellProperty::Label);
    assert!(!visual);

    let (region, _, visual) = seen[1];
    assert_eq!(region.start_row, 5);
    assert!(visual);
}

#[test]
fn record_projection_round_trips_through_text() {
    let source = AttributeCascade::new();
    source
        .set_cell_property(0, 1, false, CellProperty::Label, "alpha".into())
        .unwrap();
    source
        .set_column_property(4, false, CellProperty::Background, color(80), true)
        .unwrap();
    source
        .set_row_property(2, true, CellProperty::ToolTip, "visual row".into(), true)
        .unwrap();

    let records = source.serialized_records();
    assert!(records.iter().any(|(scope, _)| matches!(scope, RecordScope::Default)));

    let target = AttributeCascade::new();
    for (scope, entries) in &records {
        target.apply_record(*scope, entries).unwrap();
    }

    assert_eq!(
        target
            .cell_property(0, 1, CellProperty::Label, None)
            .and_then(|v| v.as_str().map(String::from)),
        Some("alpha".to_string())
    );
    assert_eq!(
        target
            .column_property(4, CellProperty::Background, None)
            .and_then(|v| v.as_color()),
        Some(Color::from_rgb8(80, 80, 80))
    );
    assert_eq!(
        target
            .row_property(0, CellProperty::ToolTip, Some(2))
            .and_then(|v| v.as_str().map(String::from)),
        Some("visual row".to_string())
    );
}
