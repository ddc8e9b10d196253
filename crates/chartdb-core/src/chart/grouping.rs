//! Groups the flat difficulty list of the external database into charts.
//!
//! Pass 1 turns every positive set id into exactly one chart. Pass 2 handles
//! difficulties without a usable set id: they join an earlier pass-2 chart
//! with the same [`composite key`](Difficulty::composite_key) or start a new
//! one. Trusted charts are never merged by text.

use std::collections::HashMap;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

use super::chart::ChartKey;
use super::difficulty::Difficulty;
use super::library::ChartLibrary;

pub fn group_difficulties(
    difficulties: Vec<Difficulty>,
    cancel: &CancelToken,
) -> Result<ChartLibrary> {
    let mut set_order: Vec<i32> = Vec::new();
    let mut sets: HashMap<i32, Vec<Difficulty>> = HashMap::new();
    let mut untrusted: Vec<Difficulty> = Vec::new();

    for difficulty in difficulties {
        let set_id = difficulty.set_id;
        if set_id > 0 {
            sets.entry(set_id)
                .or_insert_with(|| {
                    set_order.push(set_id);
                    Vec::new()
                })
                .push(difficulty);
        } else {
            untrusted.push(difficulty);
        }
    }

    let mut library = ChartLibrary::new();

    for set_id in set_order {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(members) = sets.remove(&set_id) {
            library.add_chart(ChartKey::SetId(set_id), members);
        }
    }

    let mut by_key: HashMap<String, usize> = HashMap::new();
    for difficulty in untrusted {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let key = difficulty.composite_key();
        match by_key.get(&key) {
            Some(&pos) => library.push_difficulty(pos, difficulty),
            None => {
                let pos = library.add_chart(ChartKey::Composite(key.clone()), vec![difficulty]);
                by_key.insert(key, pos);
            }
        }
    }

    debug!(
        "Grouped {} difficulties into {} charts",
        library.num_difficulties(),
        library.len()
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Md5Hash;

    fn diff(n: u8, set_id: i32, title: &str, artist: &str, creator: &str) -> Difficulty {
        let mut d = Difficulty::new(Md5Hash::parse(&format!("{:032x}", n)).unwrap());
        d.set_id = set_id;
        d.title = title.to_string();
        d.artist = artist.to_string();
        d.creator = creator.to_string();
        d
    }

    #[test]
    fn test_same_set_id_one_chart() {
        let lib = group_difficulties(
            vec![diff(1, 5, "A", "B", "C"), diff(2, 5, "A", "B", "C")],
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(lib.len(), 1);
        assert_eq!(lib.charts()[0].difficulties().len(), 2);
        assert_eq!(lib.charts()[0].key(), &ChartKey::SetId(5));
    }

    #[test]
    fn test_trusted_sets_not_merged_by_text() {
        let lib = group_difficulties(
            vec![diff(1, 5, "A", "B", "C"), diff(2, 6, "A", "B", "C")],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_untrusted_with_same_key_merge() {
        let lib = group_difficulties(
            vec![diff(1, -1, "A", "B", "C"), diff(2, 0, "A", "B", "C")],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.charts()[0].difficulties().len(), 2);
    }

    #[test]
    fn test_untrusted_different_creator_stay_separate() {
        let lib = group_difficulties(
            vec![diff(1, -1, "A", "B", "C"), diff(2, -1, "A", "B", "D")],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_untrusted_does_not_join_trusted() {
        let lib = group_difficulties(
            vec![diff(1, 7, "A", "B", "C"), diff(2, -1, "A", "B", "C")],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_key_is_case_sensitive() {
        let lib = group_difficulties(
            vec![diff(1, -1, "a", "B", "C"), diff(2, -1, "A", "B", "C")],
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = group_difficulties(vec![diff(1, 5, "A", "B", "C")], &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
