//! Fuzz target for pack parsing and delta resolution.

#![no_main]

use ferry_git::pack::apply_delta;
use ferry_git::PackParser;
use ferry_storage::ObjectStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let store = ObjectStore::new();
    if let Ok(ids) = PackParser::new(data).parse(&store) {
        // Everything reported as parsed must be retrievable.
        for id in ids {
            assert!(store.contains(&id));
        }
    }

    if let Some((split, rest)) = data.split_first() {
        let at = usize::from(*split).min(rest.len());
        let (base, delta) = rest.split_at(at);
        let _ = apply_delta(base, delta);
    }
});
