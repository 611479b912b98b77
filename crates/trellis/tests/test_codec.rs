//! Tests for the property line format.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::{collection::btree_map, prelude::*};
    use trellis::{
        PropertyMap,
        codec::{escape, leading_int, parse_document, unescape},
    };

    #[test]
    fn comma_in_value() {
        let m = PropertyMap::from([("x", "10"), ("y", "5,5")]);
        assert_eq!(m.serialize(), "x=10,y=5%2C5");
        assert_eq!(PropertyMap::deserialize("x=10,y=5%2C5"), m);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let m = PropertyMap::deserialize("a=1,junk,b=2,=3,c=%zz");
        assert_eq!(m.value("a"), "1");
        assert_eq!(m.value("b"), "2");
        assert_eq!(m.value(""), "3");
        assert_eq!(m.value("c"), "%zz");
        assert!(!m.contains_key("junk"));
    }

    #[test]
    fn documents_group_by_layout() {
        let doc = "  layout=A,name=a\r\n# comment\n\nname=loose\nlayout=B,name=b\nlayout=A,name=c\n";
        let layouts = parse_document(doc);
        let names: Vec<(&str, Vec<&str>)> = layouts
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str(),
                    v.iter().map(|l| l.props.value("name")).collect(),
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![("", vec!["loose"]), ("A", vec!["a", "c"]), ("B", vec!["b"])]
        );
        assert_eq!(layouts["A"][0].text, "layout=A,name=a");
    }

    #[test]
    fn atoi() {
        assert_eq!(leading_int("  42px"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("99999999999"), i32::MAX);
        assert_eq!(leading_int("-99999999999"), i32::MIN);
    }

    proptest! {
        #[test]
        fn escape_round_trips(s in any::<String>()) {
            prop_assert_eq!(unescape(&escape(&s)), s);
        }

        #[test]
        fn escaped_text_has_no_separators(s in any::<String>()) {
            let e = escape(&s);
            prop_assert!(!e.contains(',') && !e.contains('='));
            prop_assert!(e.bytes().all(|b| (0x20..0x7f).contains(&b)));
        }

        #[test]
        fn separators_survive(s in "[,=%\\x00-\\x1f a-z]{0,24}") {
            prop_assert_eq!(unescape(&escape(&s)), s);
        }

        #[test]
        fn maps_round_trip(entries in btree_map(any::<String>(), "[^\\x00]*", 0..8)) {
            let m: PropertyMap = entries.into_iter().collect();
            prop_assert_eq!(PropertyMap::deserialize(&m.serialize()), m);
        }
    }
}
