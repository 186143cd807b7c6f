use proptest::prelude::*;
use trace_recon::columns::{
    CanonicalColumn, ColumnName, SYNONYMS, SynonymTable, match_key, normalize, title_case,
};

/// Re-spells a synonym with random casing, padding, doubled spaces and accents.
fn respell(spelling: &str, mask: &[bool], pad_left: usize, pad_right: usize) -> String {
    let mut out = " ".repeat(pad_left);
    for (idx, ch) in spelling.chars().enumerate() {
        let flip = mask.get(idx % mask.len().max(1)).copied().unwrap_or(false);
        let ch = if flip { accent(ch) } else { ch };
        if ch == ' ' && flip {
            out.push_str("  ");
        } else if flip {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }
    out.push_str(&" ".repeat(pad_right));
    out
}

fn accent(ch: char) -> char {
    match ch {
        'a' => 'ã',
        'e' => 'é',
        'o' => 'ô',
        'c' => 'ç',
        other => other,
    }
}

fn synonym_strategy() -> impl Strategy<Value = (CanonicalColumn, &'static str)> {
    let pairs = SYNONYMS
        .iter()
        .flat_map(|(column, spellings)| spellings.iter().map(move |s| (*column, *s)))
        .collect::<Vec<_>>();
    proptest::sample::select(pairs)
}

proptest! {
    #[test]
    fn respelled_synonyms_map_to_their_canonical_column(
        (column, spelling) in synonym_strategy(),
        mask in proptest::collection::vec(any::<bool>(), 1..8),
        pad_left in 0usize..3,
        pad_right in 0usize..3,
    ) {
        let raw = respell(spelling, &mask, pad_left, pad_right);
        prop_assert_eq!(normalize(&raw), ColumnName::Canonical(column));
    }

    #[test]
    fn unknown_headers_only_change_in_spacing_and_case(
        words in proptest::collection::vec("[a-z]{1,6}", 1..4),
    ) {
        let raw = format!("  x{}  ", words.join("   "));
        let key = match_key(&raw);
        prop_assume!(SynonymTable::builtin().lookup(&raw).is_none());
        let normalized = normalize(&raw);
        prop_assert_eq!(normalized.clone(), ColumnName::Other(title_case(&raw)));
        prop_assert_eq!(normalized.to_string().to_lowercase(), key);
    }
}

#[test]
fn legacy_export_headers_resolve() {
    let cases = [
        ("Item", CanonicalColumn::Item),
        ("Descrição do Item", CanonicalColumn::Description),
        ("Description", CanonicalColumn::Description),
        ("Descrição", CanonicalColumn::Description),
        ("Endereço Origem", CanonicalColumn::AddressOrigin),
        ("Endereço Destino", CanonicalColumn::AddressDestination),
        ("Endereço", CanonicalColumn::Address),
        ("Quantidade Não Alocada", CanonicalColumn::UnallocatedQuantity),
        ("Qtd Atual", CanonicalColumn::CurrentQuantity),
        ("Qnt endereço", CanonicalColumn::CurrentQuantity),
    ];
    for (raw, expected) in cases {
        assert_eq!(normalize(raw), ColumnName::Canonical(expected), "{raw}");
    }
}
