#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::engine::LocationEngine;
    use crate::error::AppError;
    use crate::geo;
    use crate::store::{LocationStore, MemoryLocationStore};
    use crate::tests::fixtures::*;
    use crate::types::{Coordinates, CoordinatesInput, LocationInput, Season, TimeOfDay};

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn engine(store: &MemoryLocationStore) -> LocationEngine {
        let state = state_with(store.clone());
        (*state.engine).clone()
    }

    async fn seeded(count: usize) -> MemoryLocationStore {
        let store = memory_store().await;
        seed(&store, (0..count).map(|i| sample_location(&format!("Spot {:02}", i), 47.0, 8.0)).collect()).await;
        store
    }

    #[tokio::test]
    async fn test_empty_filters_match_everything() {
        let store = seeded(3).await;
        let page = engine(&store).search(&params(&[])).await.unwrap();
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.locations.len(), 3);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, 10);
        assert_eq!(page.pagination.pages, 1);
    }

    #[tokio::test]
    async fn test_results_are_newest_first() {
        let store = seeded(4).await;
        let page = engine(&store).search(&params(&[])).await.unwrap();
        let ids: Vec<i64> = page.locations.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_page_sizes_follow_total() {
        let store = seeded(23).await;
        let engine = engine(&store);

        let first = engine.search(&params(&[("limit", "10")])).await.unwrap();
        assert_eq!(first.pagination.pages, 3);

        for (page, expected) in [("1", 10), ("2", 10), ("3", 3), ("4", 0)] {
            let result = engine.search(&params(&[("limit", "10"), ("page", page)])).await.unwrap();
            assert_eq!(result.locations.len(), expected, "page {}", page);
            assert_eq!(result.pagination.total, 23);
        }
    }

    #[tokio::test]
    async fn test_pages_do_not_overlap() {
        let store = seeded(7).await;
        let engine = engine(&store);
        let mut seen = Vec::new();
        for page in ["1", "2", "3"] {
            let result = engine.search(&params(&[("limit", "3"), ("page", page)])).await.unwrap();
            seen.extend(result.locations.into_iter().map(|l| l.id));
        }
        seen.sort();
        assert_eq!(seen, (1..=7).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_combined_filters_are_conjunctive() {
        let store = memory_store().await;
        let mut a = sample_location("Lavender field", 44.0, 5.0);
        a.category_id = 2;
        a.best_season = Some(Season::Summer);
        let mut b = sample_location("Snowy bridge", 44.0, 5.0);
        b.category_id = 2;
        b.best_season = Some(Season::Winter);
        let mut c = sample_location("Beach huts", 44.0, 5.0);
        c.category_id = 5;
        c.best_season = Some(Season::Summer);
        seed(&store, vec![a, b, c]).await;

        let page = engine(&store)
            .search(&params(&[("category_id", "2"), ("best_season", "summer")]))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.locations[0].name, "Lavender field");
    }

    #[tokio::test]
    async fn test_total_equals_unpaged_predicate_count() {
        let store = memory_store().await;
        let mut rows = Vec::new();
        for i in 0..30 {
            let mut new = sample_location(&format!("Spot {}", i), 47.0, 8.0);
            new.category_id = 1 + (i % 3);
            new.best_time_of_day = if i % 2 == 0 { Some(TimeOfDay::Sunset) } else { None };
            new.permission_required = i % 5 == 0;
            rows.push(new);
        }
        seed(&store, rows).await;
        let engine = engine(&store);

        let combos: Vec<Vec<(&str, &str)>> = vec![
            vec![],
            vec![("category_id", "1")],
            vec![("best_time_of_day", "sunset")],
            vec![("category_id", "2"), ("best_time_of_day", "sunset")],
            vec![("permission_required", "true")],
            vec![("permission_required", "false"), ("category_id", "3")],
            vec![("search", "spot 1")],
        ];
        for combo in combos {
            let paged = engine.search(&params(&[combo.as_slice(), &[("limit", "4")][..]].concat())).await.unwrap();
            let all = engine.search(&params(&[combo.as_slice(), &[("limit", "100")][..]].concat())).await.unwrap();
            assert_eq!(paged.pagination.total, all.locations.len() as i64, "filters {:?}", combo);
        }
    }

    #[tokio::test]
    async fn test_search_matches_name_or_description_case_insensitively() {
        let store = memory_store().await;
        let mut by_name = sample_location("Misty FOREST trail", 47.0, 8.0);
        by_name.description = "Trail".into();
        let mut by_description = sample_location("Old mill", 47.0, 8.0);
        by_description.description = "Stream through a forest".into();
        let unrelated = sample_location("Harbour", 47.0, 8.0);
        seed(&store, vec![by_name, by_description, unrelated]).await;

        let page = engine(&store).search(&params(&[("search", "Forest")])).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        for location in &page.locations {
            let haystack = format!("{} {}", location.name, location.description).to_lowercase();
            assert!(haystack.contains("forest"));
        }
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let store = memory_store().await;
        seed(&store, vec![sample_location("100% sunrise", 1.0, 1.0), sample_location("Sunrise", 1.0, 1.0)]).await;
        let page = engine(&store).search(&params(&[("search", "%")])).await.unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_unparseable_permission_flag_is_rejected() {
        let store = seeded(1).await;
        let err = engine(&store).search(&params(&[("permission_required", "maybe")])).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_nearby_returns_points_within_radius_nearest_first() {
        let store = memory_store().await;
        let p = Coordinates { latitude: 46.0, longitude: 7.0 };
        seed(
            &store,
            vec![
                sample_location("twenty", north_of(p, 20.0).latitude, p.longitude),
                sample_location("five", north_of(p, 5.0).latitude, p.longitude),
                sample_location("one", north_of(p, 1.0).latitude, p.longitude),
            ],
        )
        .await;

        let hits = engine(&store)
            .nearby(&params(&[("latitude", "46.0"), ("longitude", "7.0"), ("radius", "10")]))
            .await
            .unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.location.name.as_str()).collect();
        assert_eq!(names, vec!["one", "five"]);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
        assert!((hits[1].distance - 5.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_nearby_defaults_radius_to_ten_km() {
        let store = memory_store().await;
        let p = Coordinates { latitude: -33.9, longitude: 18.4 };
        seed(
            &store,
            vec![
                sample_location("inside", north_of(p, 9.5).latitude, p.longitude),
                sample_location("outside", north_of(p, 10.5).latitude, p.longitude),
            ],
        )
        .await;

        let hits = engine(&store).nearby(&params(&[("latitude", "-33.9"), ("longitude", "18.4")])).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].location.name, "inside");
    }

    #[tokio::test]
    async fn test_nearby_is_capped_at_fifty_nearest() {
        let store = memory_store().await;
        let p = Coordinates { latitude: 10.0, longitude: 10.0 };
        // 60 points at 0.1 km .. 6.0 km, inserted farthest first
        let rows = (1..=60)
            .rev()
            .map(|i| {
                let at = north_of(p, i as f64 * 0.1);
                sample_location(&format!("p{}", i), at.latitude, at.longitude)
            })
            .collect();
        seed(&store, rows).await;

        let hits = engine(&store)
            .nearby(&params(&[("latitude", "10"), ("longitude", "10"), ("radius", "10")]))
            .await
            .unwrap();
        assert_eq!(hits.len(), 50);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(hits.iter().all(|h| h.distance <= 10.0 + 1e-9));
        assert_eq!(hits.last().unwrap().location.name, "p50");
        for hit in &hits {
            let expected = geo::distance_km(p, hit.location.coordinates);
            assert!((hit.distance - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_nearby_without_coordinates_is_a_validation_error() {
        let store = seeded(1).await;
        let err = engine(&store).nearby(&params(&[("latitude", "46.0")])).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "coordinates"));
    }

    #[tokio::test]
    async fn test_create_assigns_creator_and_timestamps() {
        let store = memory_store().await;
        let location = engine(&store).create(&owner(), sample_input("Lake")).await.unwrap();
        assert_eq!(location.created_by, OWNER_ID);
        assert_eq!(location.creator_username.as_deref(), Some("ada"));
        assert_eq!(location.category_name.as_deref(), Some("Landscape"));
        assert_eq!(location.created_at, location.updated_at);
        assert!(!location.permission_required);
    }

    #[tokio::test]
    async fn test_create_without_category_persists_nothing() {
        let store = memory_store().await;
        let input = LocationInput { category_id: None, ..sample_input("Lake") };
        let err = engine(&store).create(&owner(), input).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "category_id"));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields_and_bad_values() {
        let store = memory_store().await;
        let engine = engine(&store);
        let cases = vec![
            ("name", LocationInput { name: Some("  ".into()), ..sample_input("x") }),
            ("description", LocationInput { description: None, ..sample_input("x") }),
            ("address", LocationInput { address: None, ..sample_input("x") }),
            ("coordinates", LocationInput { coordinates: None, ..sample_input("x") }),
            (
                "coordinates",
                LocationInput {
                    coordinates: Some(CoordinatesInput { latitude: Some(1.0), longitude: None }),
                    ..sample_input("x")
                },
            ),
            (
                "latitude",
                LocationInput {
                    coordinates: Some(CoordinatesInput { latitude: Some(95.0), longitude: Some(1.0) }),
                    ..sample_input("x")
                },
            ),
            ("category_id", LocationInput { category_id: Some(999), ..sample_input("x") }),
            ("best_season", LocationInput { best_season: Some("monsoon".into()), ..sample_input("x") }),
        ];
        for (expected_field, input) in cases {
            match engine.create(&owner(), input).await {
                Err(AppError::ValidationError { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error on {}, got {:?}", expected_field, other),
            }
        }
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_partial_update_changes_only_supplied_fields() {
        let store = memory_store().await;
        let engine = engine(&store);
        let mut input = sample_input("Before");
        input.best_season = Some("autumn".into());
        input.permission_required = Some(true);
        let before = engine.create(&owner(), input).await.unwrap();

        let patch = LocationInput { name: Some("X".into()), ..Default::default() };
        let after = engine.update(&owner(), before.id, patch).await.unwrap();

        assert_eq!(after.name, "X");
        assert_eq!(after.description, before.description);
        assert_eq!(after.address, before.address);
        assert_eq!(after.coordinates, before.coordinates);
        assert_eq!(after.category_id, before.category_id);
        assert_eq!(after.best_season, Some(Season::Autumn));
        assert!(after.permission_required);
        assert_eq!(after.created_by, before.created_by);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_partial_coordinates_update_is_rejected() {
        let store = memory_store().await;
        let engine = engine(&store);
        let before = engine.create(&owner(), sample_input("Pier")).await.unwrap();

        let patch = LocationInput {
            coordinates: Some(CoordinatesInput { latitude: Some(1.0), longitude: None }),
            ..Default::default()
        };
        assert!(matches!(engine.update(&owner(), before.id, patch).await, Err(AppError::ValidationError { .. })));
        assert_eq!(engine.get(before.id).await.unwrap().coordinates, before.coordinates);
    }

    #[tokio::test]
    async fn test_update_changes_category_name() {
        let store = memory_store().await;
        let engine = engine(&store);
        let before = engine.create(&owner(), sample_input("Pier")).await.unwrap();
        let patch = LocationInput { category_id: Some(5), ..Default::default() };
        let after = engine.update(&owner(), before.id, patch).await.unwrap();
        assert_eq!(after.category_name.as_deref(), Some("Beach"));
    }

    #[tokio::test]
    async fn test_non_owner_update_is_forbidden_and_row_unchanged() {
        let store = memory_store().await;
        let engine = engine(&store);
        let before = engine.create(&owner(), sample_input("Mine")).await.unwrap();

        let patch = LocationInput { name: Some("Hijacked".into()), ..Default::default() };
        assert!(matches!(engine.update(&stranger(), before.id, patch).await, Err(AppError::Forbidden(_))));
        assert_eq!(engine.get(before.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_admin_may_update_and_delete_any_location() {
        let store = memory_store().await;
        let engine = engine(&store);
        let location = engine.create(&owner(), sample_input("Mine")).await.unwrap();

        let patch = LocationInput { name: Some("Curated".into()), ..Default::default() };
        assert_eq!(engine.update(&admin(), location.id, patch).await.unwrap().name, "Curated");
        engine.delete(&admin(), location.id).await.unwrap();
        assert!(matches!(engine.get(location.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let store = memory_store().await;
        let engine = engine(&store);
        let location = engine.create(&owner(), sample_input("Temp")).await.unwrap();

        assert!(matches!(engine.delete(&stranger(), location.id).await, Err(AppError::Forbidden(_))));
        assert_eq!(store.len().await, 1);

        engine.delete(&owner(), location.id).await.unwrap();
        assert_eq!(store.len().await, 0);
        assert!(matches!(engine.delete(&owner(), location.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_last_writer_wins() {
        let store = memory_store().await;
        let engine = engine(&store);
        let location = engine.create(&owner(), sample_input("Shared")).await.unwrap();

        let first = LocationInput { name: Some("first".into()), ..Default::default() };
        let second = LocationInput { name: Some("second".into()), ..Default::default() };
        engine.update(&owner(), location.id, first).await.unwrap();
        engine.update(&admin(), location.id, second).await.unwrap();

        // no version check: the earlier edit is silently overwritten
        assert_eq!(engine.get(location.id).await.unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_store_failures_surface_as_storage_errors() {
        let store = seeded(2).await;
        let engine = engine(&store);
        store.set_unavailable(true);

        assert!(matches!(engine.search(&params(&[])).await, Err(AppError::Storage(_))));
        assert!(matches!(
            engine.nearby(&params(&[("latitude", "1"), ("longitude", "1")])).await,
            Err(AppError::Storage(_))
        ));
        assert!(matches!(engine.get(1).await, Err(AppError::Storage(_))));

        store.set_unavailable(false);
        assert_eq!(engine.search(&params(&[])).await.unwrap().pagination.total, 2);
    }

    #[tokio::test]
    async fn test_engine_accepts_any_store_implementation() {
        let store: Arc<dyn LocationStore> = Arc::new(MemoryLocationStore::new());
        let engine = LocationEngine::new(
            store,
            crate::config::SearchConfig::default(),
            crate::config::NearbyConfig::default(),
            crate::metrics::Metrics::new(),
        );
        assert_eq!(engine.categories().await.unwrap().len(), crate::types::DEFAULT_CATEGORIES.len());
    }
}
