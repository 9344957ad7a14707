use gto_solver::cards::*;

#[test]
fn parse_card_canonical() {
    let card = parse_card("As").unwrap();
    assert_eq!(card.rank, Rank::Ace);
    assert_eq!(card.suit, Suit::Spades);
    assert_eq!(card.to_string(), "As");
}

#[test]
fn parse_card_case_insensitive() {
    assert_eq!(parse_card("as").unwrap().to_string(), "As");
    assert_eq!(parse_card("aS").unwrap().to_string(), "As");
    assert_eq!(parse_card("tD").unwrap().to_string(), "Td");
}

#[test]
fn parse_card_rejects_garbage() {
    assert!(parse_card("Xx").is_err());
    assert!(parse_card("A").is_err());
    assert!(parse_card("Asd").is_err());
}

#[test]
fn index_roundtrip_covers_deck() {
    for id in 0u8..52 {
        let card = Card::from_index(id);
        assert_eq!(card.index(), id);
    }
    let all: std::collections::HashSet<String> = full_deck().map(|c| c.to_string()).collect();
    assert_eq!(all.len(), 52);
}

#[test]
fn parse_board_with_separators() {
    let board = parse_board("As Kd, 5c").unwrap();
    assert_eq!(board.len(), 3);
    assert_eq!(board[0].to_string(), "As");
    assert_eq!(board[2].to_string(), "5c");
}

#[test]
fn parse_board_error_carries_offending_card() {
    let err = parse_board("AsKx").unwrap_err();
    match err {
        gto_solver::SolverError::ParseError { token, position } => {
            assert_eq!(token, "Kx");
            assert_eq!(position, 2);
        }
        other => panic!("expected ParseError, got {:?}", other),
    }
}

#[test]
fn combo_ids_are_unique_and_dense() {
    let mut seen = vec![false; NUM_COMBOS];
    for a in 0u8..52 {
        for b in (a + 1)..52 {
            let id = Combo::new(a, b).id() as usize;
            assert!(!seen[id], "duplicate combo id {}", id);
            seen[id] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn combo_id_roundtrip() {
    for id in 0u16..NUM_COMBOS as u16 {
        assert_eq!(combo_from_id(id).id(), id);
    }
}

#[test]
fn combo_class_notation() {
    let aa = Combo::from_cards(parse_card("As").unwrap(), parse_card("Ah").unwrap());
    assert_eq!(aa.class(), "AA");

    let aks = Combo::from_cards(parse_card("Ks").unwrap(), parse_card("As").unwrap());
    assert_eq!(aks.class(), "AKs");

    let t9o = Combo::from_cards(parse_card("9c").unwrap(), parse_card("Td").unwrap());
    assert_eq!(t9o.class(), "T9o");
}

#[test]
fn class_combos_counts() {
    assert_eq!(class_combos("AA").unwrap().len(), 6);
    assert_eq!(class_combos("AKs").unwrap().len(), 4);
    assert_eq!(class_combos("AKo").unwrap().len(), 12);
    assert_eq!(class_combos("AsKh").unwrap().len(), 1);
}

#[test]
fn remaining_deck_excludes_dead() {
    let dead = [0u8, 13, 51];
    let deck = remaining_deck(&dead);
    assert_eq!(deck.len(), 49);
    assert!(deck.iter().all(|c| !dead.contains(c)));
}
