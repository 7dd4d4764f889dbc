use super::*;

fn pointer(peer_id: &str, nickname: Option<&str>) -> RenderedPointer {
    RenderedPointer { peer_id: peer_id.to_owned(), left_px: 0.0, top_px: 0.0, nickname: nickname.map(str::to_owned) }
}

#[test]
fn peer_color_is_stable() {
    assert_eq!(peer_color("alice"), peer_color("alice"));
    assert!(PALETTE.contains(&peer_color("bob")));
}

#[test]
fn peer_color_spreads_across_palette() {
    let distinct: std::collections::HashSet<_> = (0..64).map(|i| peer_color(&format!("peer-{i}"))).collect();
    assert!(distinct.len() > 1);
}

#[test]
fn label_requires_non_blank_nickname() {
    assert_eq!(label_text(&pointer("a", Some("Ann"))), Some("Ann"));
    assert_eq!(label_text(&pointer("a", Some("  "))), None);
    assert_eq!(label_text(&pointer("a", None)), None);
}
