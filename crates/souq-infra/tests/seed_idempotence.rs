//! Seeding a file-backed store across process restarts

use souq_infra::reference_prices;
use souq_infra::seed::SeedRunner;
use souq_infra::seed_csv::SeedData;
use souq_infra::Repositories;
use souq_store::Store;
use tempfile::TempDir;

fn open(dir: &TempDir) -> Repositories {
    let store = Store::open(dir.path().to_path_buf()).unwrap();
    Repositories::open(&store, reference_prices::builtin().unwrap()).unwrap()
}

#[test]
fn test_seed_twice_across_reopen_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let data = SeedData::sample(2026).unwrap();

    {
        let repos = open(&dir);
        let report = SeedRunner::new(&repos).run(&data, None).unwrap();
        assert_eq!(report.inserted(), data.len());
    }

    let repos = open(&dir);
    let report = SeedRunner::new(&repos).run(&data, None).unwrap();
    assert_eq!(report.inserted(), 0);
    assert_eq!(repos.listings.find_all().unwrap().len(), data.listings.len());
    assert_eq!(
        repos.barter_items.find_all().unwrap().len(),
        data.barter_items.len()
    );
    assert_eq!(
        repos.market_data.comparables().unwrap().len(),
        data.comparables.len()
    );
}

#[test]
fn test_dedupe_repairs_duplicated_rows_on_disk() {
    let dir = TempDir::new().unwrap();
    let data = SeedData::sample(2026).unwrap();
    {
        let repos = open(&dir);
        SeedRunner::new(&repos).run(&data, None).unwrap();
        // Same listing written again under a fresh id, as an older seeder did
        let mut copy = data.listings[0].clone();
        copy.id = "legacy-copy".to_string();
        copy.created_at = copy.created_at + chrono::Duration::seconds(5);
        repos.listings.save(&copy).unwrap();
        assert_eq!(
            repos.listings.find_all().unwrap().len(),
            data.listings.len() + 1
        );
    }

    let repos = open(&dir);
    let removed = SeedRunner::new(&repos).dedupe().unwrap();
    assert_eq!(removed.listings, 1);
    assert!(repos.listings.find_by_id("legacy-copy").unwrap().is_none());
    assert!(repos
        .listings
        .find_by_id(&data.listings[0].id)
        .unwrap()
        .is_some());
}

#[test]
fn test_clean_then_reseed() {
    let dir = TempDir::new().unwrap();
    let data = SeedData::sample(2026).unwrap();
    let repos = open(&dir);
    let runner = SeedRunner::new(&repos);
    runner.run(&data, None).unwrap();
    runner.clean().unwrap();
    assert!(repos.listings.find_all().unwrap().is_empty());

    let report = runner.run(&data, None).unwrap();
    assert_eq!(report.listings.inserted, data.listings.len());
    assert_eq!(report.barter_items.inserted, data.barter_items.len());
    // profiles and preferences survive a clean
    assert_eq!(report.profiles.inserted, 0);
}
