//! Property tests over token sets of arbitrary size

use lootbox_core::{MintPipeline, TokenId};
use lootbox_test_utils::{deps, test_config, FakeContract, LootFixture, MemoryStore, RECIPIENT_HANDLE};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_token_minted_once_with_distinct_uri(
        ids in proptest::collection::btree_set(0u32..10_000, 1..12)
    ) {
        let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let fixture = LootFixture::with_tokens(&refs);
        let store = Arc::new(MemoryStore::new());
        let contract = Arc::new(FakeContract::new());

        let report = runtime().block_on(async {
            MintPipeline::new(&test_config(), deps(&store, &contract))
                .unwrap()
                .run(fixture.request(RECIPIENT_HANDLE))
                .await
                .unwrap()
        });

        let submitted = contract.submitted();
        prop_assert_eq!(submitted.len(), ids.len());
        prop_assert_eq!(report.confirmed(), ids.len());

        let uris: BTreeSet<_> = submitted.iter().map(|m| m.token_uri.clone()).collect();
        prop_assert_eq!(uris.len(), ids.len());
        for m in &submitted {
            prop_assert!(m.token_uri.starts_with(&report.metadata.base_uri));
        }

        // btree_set of u32 is already in numeric order
        let expected: Vec<TokenId> = ids.iter().map(TokenId::new).collect();
        prop_assert_eq!(report.tokens, expected);
    }

    #[test]
    fn enumeration_order_is_total(a in "[0-9a-z]{1,6}", b in "[0-9a-z]{1,6}") {
        let (a, b) = (TokenId::new(a), TokenId::new(b));
        prop_assert_eq!(a.enumeration_cmp(&b), b.enumeration_cmp(&a).reverse());
        if a.enumeration_cmp(&b).is_eq() {
            prop_assert_eq!(a, b);
        }
    }
}
