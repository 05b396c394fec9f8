//! Collection reconciliation
//!
//! Turns a search result into the record changes for a pin. Slots are
//! filled by position: an occupied slot is recycled in place, an empty one
//! gets a new record. Each slot draws a random photo from the whole result
//! page, with replacement, so two slots may show the same photo.

use crate::client::SearchResult;
use crate::config::{MAX_PHOTOS, PAGE_CEILING};
use crate::database::{Photo, PhotoDraft, Pin, ReconcilePlan, SlotChange};
use rand::Rng;

/// Plan the record changes of one sync.
///
/// `existing` must be the pin's photos in position order, freshly read from the store.
pub fn plan_reconciliation<R: Rng + ?Sized>(
    pin: &Pin,
    existing: Vec<Photo>,
    result: &SearchResult,
    rng: &mut R,
) -> ReconcilePlan {
    let total_photos = result.total_photos.max(0);

    let discovered_pages = if pin.total_pages.is_none() && result.total_pages > 0 {
        Some(result.total_pages.min(i64::from(PAGE_CEILING)))
    } else {
        None
    };

    let total_limit = usize::try_from(total_photos).unwrap_or(usize::MAX);

    // Oldest slots go first when the area now has fewer photos than we hold
    let surplus = existing.len().saturating_sub(total_limit);
    let mut remaining = existing;
    let mut deletes: Vec<Photo> = remaining.drain(..surplus).collect();

    let slot_count = result
        .photos
        .len()
        .min(MAX_PHOTOS)
        .min(total_limit);

    let mut remaining = remaining.into_iter();
    let mut slots = Vec::with_capacity(slot_count);

    for position in 0..slot_count {
        let pick = &result.photos[rng.gen_range(0..result.photos.len())];
        let draft = PhotoDraft {
            position: position as i64,
            url: pick.url.clone(),
            title: pick.title.clone(),
            cache_key: Photo::cache_key_for(&pick.id, &pick.secret),
        };

        slots.push(match remaining.next() {
            Some(photo) => SlotChange::Recycle { photo, draft },
            None => SlotChange::Create(draft),
        });
    }

    let mut retained: Vec<Photo> = remaining.collect();
    let room = MAX_PHOTOS.saturating_sub(slots.len());
    if retained.len() > room {
        deletes.extend(retained.drain(room..));
    }

    ReconcilePlan {
        pin_id: pin.id.clone(),
        total_photos,
        discovered_pages,
        deletes,
        slots,
        retained,
    }
}
