use library_atlas::{
    selection::SortDirection,
    stats_reader::{Metric, StatsSchema, TabularIndex},
    sync::{SearchOutcome, SyncController},
    year::Year,
};

const STATS: &str = "\
code,name,metric_2022
091,Helsinki,12.5
179,Jyväskylä,
";

fn controller() -> SyncController {
    let index = TabularIndex::from_reader(STATS.as_bytes(), &StatsSchema::default(), None)
        .expect("statistics parse");
    SyncController::new(index)
}

#[test]
fn click_then_reclick_round_trips_to_empty() {
    let mut c = controller();
    let data = c.index().metrics.year_data("091");
    assert!(c.on_municipality_activated("091", "Helsinki", data.clone()));

    let entries = c.selection().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].code, "091");
    assert_eq!(entries[0].name, "Helsinki");
    assert_eq!(entries[0].year_data.get(&Year(2022)), Some(&Metric::Value(12.5)));

    assert!(!c.on_municipality_activated("091", "Helsinki", data));
    assert!(c.selection().is_empty());
}

#[test]
fn present_value_outranks_absent_when_descending() {
    let mut c = controller();
    c.on_search_submitted("Jyväskylä");
    c.on_search_submitted("helsinki");
    assert_eq!(c.toggle_sort(), SortDirection::Descending);
    let names: Vec<&str> = c.selection().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Helsinki", "Jyväskylä"]);
}

#[test]
fn search_in_any_case_hits_the_same_code() {
    let mut a = controller();
    let mut b = controller();
    assert_eq!(a.on_search_submitted("HELSINKI"), SearchOutcome::Selected("091".into()));
    assert_eq!(b.on_search_submitted("Helsinki"), SearchOutcome::Selected("091".into()));
    assert_eq!(a.selection(), b.selection());
    assert_eq!(a.on_search_submitted("Turku"), SearchOutcome::NotFound);
    assert_eq!(a.selection().len(), 1);
}
