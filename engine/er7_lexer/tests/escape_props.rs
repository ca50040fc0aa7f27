use er7_lexer::{escape, unescape, Delimiters, EscapeMode};
use proptest::prelude::*;

fn profiles() -> impl Strategy<Value = Delimiters> {
    prop_oneof![
        Just(Delimiters::default()),
        Just(Delimiters {
            field: '#',
            component: '!',
            repetition: '*',
            escape: '$',
            subcomponent: '%',
            truncation: None,
        }),
        Just(Delimiters {
            truncation: Some('#'),
            ..Delimiters::default()
        }),
    ]
}

fn values() -> impl Strategy<Value = String> {
    // Bias towards control characters so sequences actually form.
    proptest::collection::vec(
        prop_oneof![
            3 => proptest::char::range('a', 'z'),
            1 => Just('|'),
            1 => Just('^'),
            1 => Just('~'),
            2 => Just('\\'),
            1 => Just('&'),
            1 => Just('#'),
            1 => Just('$'),
            1 => Just('F'),
            1 => Just('X'),
            1 => Just('4'),
            1 => Just('H'),
            1 => Just('\r'),
            1 => Just('\n'),
        ],
        0..24,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn unescape_inverts_escape(d in profiles(), value in values()) {
        let wire = escape(&value, &d);
        let back = unescape(&wire, &d, EscapeMode::Tolerant).expect("tolerant never fails");
        prop_assert_eq!(back.as_ref(), value.as_str());
    }

    #[test]
    fn strict_unescape_accepts_every_escaped_value(d in profiles(), value in values()) {
        let wire = escape(&value, &d);
        let back = unescape(&wire, &d, EscapeMode::Strict);
        prop_assert_eq!(back.as_deref(), Ok(value.as_str()));
    }

    #[test]
    fn escaped_text_never_carries_separators(d in profiles(), value in values()) {
        let wire = escape(&value, &d);
        for c in wire.chars() {
            prop_assert!(c != d.field && c != d.component && c != d.repetition);
            prop_assert!(c != d.subcomponent && Some(c) != d.truncation);
            prop_assert!(c != '\r' && c != '\n');
        }
    }

    #[test]
    fn values_without_delimiters_are_untouched(value in "[a-zA-Z0-9 .]{0,32}") {
        let d = Delimiters::default();
        let escaped = escape(&value, &d);
        prop_assert_eq!(escaped.as_ref(), value.as_str());
        let unescaped = unescape(&value, &d, EscapeMode::Strict).expect("nothing to unescape");
        prop_assert_eq!(
            unescaped.as_ref(),
            value.as_str()
        );
    }
}
