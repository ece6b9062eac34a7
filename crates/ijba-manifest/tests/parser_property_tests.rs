use ijba_manifest::{ManifestLayout, Point, RecordParser};
use proptest::prelude::*;

fn coordinate() -> impl Strategy<Value = Option<f64>> {
    proptest::option::of((0u32..5000).prop_map(|v| f64::from(v) / 4.0))
}

fn flag() -> impl Strategy<Value = Option<i64>> {
    proptest::option::of(0i64..6)
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

proptest! {
    #[test]
    fn landmarks_follow_the_pairing_rule(
        re in (coordinate(), coordinate()),
        le in (coordinate(), coordinate()),
        nose in (coordinate(), coordinate()),
        yaw in coordinate(),
        flags in proptest::collection::vec(flag(), 7),
        sighting in proptest::option::of(0u32..10),
        frame in proptest::option::of(0u32..100000),
    ) {
        let mut cells: Vec<String> = vec![
            "7".into(), "42".into(), "frame/1_00001.png".into(), "1".into(),
            cell(sighting), cell(frame),
            "1".into(), "2".into(), "3".into(), "4".into(),
            cell(re.0), cell(re.1), cell(le.0), cell(le.1), cell(nose.0), cell(nose.1), cell(yaw),
        ];
        cells.extend(flags.iter().map(|f| cell(*f)));
        cells.push(String::new());
        let line = cells.join(",");

        let parser = RecordParser::new("prop.csv", ManifestLayout::Current);
        let row = parser.parse_line(2, &line).unwrap();
        let annotation = row.record.annotation.unwrap();

        let pair = |p: (Option<f64>, Option<f64>)| match p {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };
        prop_assert_eq!(annotation.right_eye, pair(re));
        prop_assert_eq!(annotation.left_eye, pair(le));
        prop_assert_eq!(annotation.nose, pair(nose));
        prop_assert_eq!(annotation.yaw, yaw);
        prop_assert_eq!(annotation.flags.forehead_visible, flags[0]);
        prop_assert_eq!(annotation.flags.age, flags[6]);
        prop_assert_eq!(row.record.sighting_id, sighting);
        prop_assert_eq!(row.record.frame, frame);
    }

    #[test]
    fn any_other_column_count_is_rejected(extra in 1usize..6, fewer in 1usize..20) {
        let parser = RecordParser::new("prop.csv", ManifestLayout::Current);
        let full = vec!["1"; 25];

        let longer = [full.clone(), vec![""; extra]].concat().join(",");
        prop_assert!(parser.parse_line(2, &longer).is_err());

        let shorter = full[..25 - fewer].join(",");
        prop_assert!(parser.parse_line(2, &shorter).is_err());
    }
}
