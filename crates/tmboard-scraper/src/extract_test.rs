use chrono::TimeZone;

use super::*;

const RESULTS_HEADER: &str =
    "<tr><th>#</th><th>Player</th><th>Finishes</th><th>Avg</th><th>Avg finished</th></tr>";

const MAPS_HEADER: &str = "<tr><th>Map</th><th>Author</th><th>Record</th><th>Holder</th>\
     <th>Finishes</th><th>Karma</th></tr>";

fn page(rows: &str) -> Html {
    Html::parse_document(&format!(
        "<html><body><table>{rows}</table></body></html>"
    ))
}

fn map_row(name_cell: &str) -> String {
    format!(
        "<tr><td>{name_cell}</td>\
         <td><a href=players.php?pid=7><span style='color:#00ff00;'>Au</span>thor</a></td>\
         <td>00:42.117</td>\
         <td><a href=players.php?pid=9>Holder</a></td>\
         <td>12</td><td>87.5</td></tr>"
    )
}

#[test]
fn results_row_matches_expected_record() {
    let html = page(
        "<tr><td>1</td><td><a href=players.php?pid=1><span style='color:#ffffff;'>A</span>b</a></td>\
         <td>5</td><td>1.5</td><td>2.5</td></tr>",
    );
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(
        rows,
        vec![LeaderboardRow {
            rank: 1,
            nickname: "Ab".to_string(),
            name_formatted: "$<$fffA$>b".to_string(),
            finishes: 5,
            average: Some(1.5),
            average_finished: Some(2.5),
        }]
    );
}

#[test]
fn results_keep_source_order_and_skip_header_rows() {
    let html = page(&format!(
        "{RESULTS_HEADER}\
         <tr><td>2</td><td><a>Second</a></td><td>3</td><td>4.0</td><td>4.5</td></tr>\
         <tr><td>1</td><td><a>First</a></td><td>9</td><td>1.0</td><td>1.1</td></tr>"
    ));
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![2, 1]);
    assert_eq!(rows[0].nickname, "Second");
}

#[test]
fn results_row_with_three_cells_has_no_averages() {
    let html = page("<tr><td>4</td><td>Name</td><td>0</td></tr>");
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(rows[0].average, None);
    assert_eq!(rows[0].average_finished, None);
    assert_eq!(rows[0].name_formatted, "Name");
}

#[test]
fn results_dash_average_reads_as_none() {
    let html = page("<tr><td>4</td><td>Name</td><td>0</td><td>-</td><td></td></tr>");
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(rows[0].average, None);
    assert_eq!(rows[0].average_finished, None);
}

#[test]
fn results_row_with_two_cells_is_malformed() {
    let html = page(&format!(
        "{RESULTS_HEADER}<tr><td>1</td><td>Only two</td></tr>"
    ));
    let err = extract_results(&html, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::MalformedRow {
                table: BoardTable::Results,
                row: 1,
                cells: 2,
                expected: 3
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn skip_policy_drops_short_rows_only() {
    let html = page(
        "<tr><td>1</td><td>Short</td></tr>\
         <tr><td>2</td><td>Kept</td><td>3</td><td>1.0</td><td>1.0</td></tr>",
    );
    let rows = extract_results(
        &html,
        &ExtractOptions::with_policy(MalformedRowPolicy::Skip),
    )
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].nickname, "Kept");
}

#[test]
fn skip_policy_still_aborts_on_transcode_errors() {
    let html = page("<tr><td>1</td><td><a><em>x</em></a></td><td>3</td></tr>");
    let err = extract_results(
        &html,
        &ExtractOptions::with_policy(MalformedRowPolicy::Skip),
    )
    .unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::Transcode {
                column: 1,
                source: TranscodeError::UnexpectedTagInLink { .. },
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn non_numeric_rank_is_rejected() {
    let html = page("<tr><td>first</td><td>Name</td><td>3</td></tr>");
    let err = extract_results(&html, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::InvalidNumber { column: 0, ref value, .. } if value == "first"),
        "got: {err:?}"
    );
}

#[test]
fn one_bad_name_invalidates_the_whole_batch() {
    let html = page(
        "<tr><td>1</td><td>Good</td><td>3</td></tr>\
         <tr><td>2</td><td><a><span style='cursor:pointer'>Bad</span></a></td><td>3</td></tr>",
    );
    let err = extract_results(&html, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::Transcode {
                row: 1,
                source: TranscodeError::UnrecognizedStyleProperty { .. },
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn maps_row_reads_uid_from_sibling_link() {
    let html = page(&format!(
        "{MAPS_HEADER}{}",
        map_row(
            "<a href=map.php?id=3><span style='color:#ff0000;font-weight:bold'>Red</span> Map</a> \
             <a href=\"./maps.php?uid=ABC123\">tmx</a>"
        )
    ));
    let rows = extract_maps(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(
        rows,
        vec![MapRow {
            map_name: "Red Map".to_string(),
            map_name_formatted: "$<$f00$oRed$> Map".to_string(),
            map_uid: "ABC123".to_string(),
            author_name: "Author".to_string(),
            author_name_formatted: "$<$0f0Au$>thor".to_string(),
            record_time: "00:42.117".to_string(),
            record_holder: "Holder".to_string(),
            record_holder_formatted: "Holder".to_string(),
            finishes: 12,
            karma: 87.5,
        }]
    );
}

#[test]
fn map_uid_ignores_parameters_before_uid() {
    let html = page(&map_row(
        "<a>Name</a><a href=\"./maps.php?season=2&amp;sort=asc&amp;uid=XyZ_9\">go</a>",
    ));
    let rows = extract_maps(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(rows[0].map_uid, "XyZ_9");
}

#[test]
fn map_without_uid_link_is_rejected() {
    let html = page(&map_row("<a href=map.php?id=3>Lonely</a>"));
    let err = extract_maps(&html, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::MissingMapUid { row: 0 }),
        "got: {err:?}"
    );
}

#[test]
fn maps_row_with_five_cells_is_malformed() {
    let html = page(
        "<tr><td><a>M</a><a href=?uid=1>u</a></td><td>A</td><td>00:01.000</td>\
         <td>H</td><td>1</td></tr>",
    );
    let err = extract_maps(&html, &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(
            err,
            ExtractError::MalformedRow {
                table: BoardTable::Maps,
                cells: 5,
                expected: 6,
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn karma_accepts_percent_suffix() {
    let row = map_row("<a>Name</a><a href=?uid=U1>x</a>").replace("<td>87.5</td>", "<td>64%</td>");
    let rows = extract_maps(&page(&row), &ExtractOptions::default()).unwrap();
    assert!((rows[0].karma - 64.0).abs() < f64::EPSILON);
}

#[test]
fn invalid_row_selector_is_reported() {
    let options = ExtractOptions {
        row_selector: "tr[".to_string(),
        ..ExtractOptions::default()
    };
    let err = extract_results(&page(""), &options).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidSelector { .. }), "got: {err:?}");
}

#[test]
fn custom_row_selector_limits_rows_to_one_table() {
    let body = "<table id=other><tr><td>x</td></tr></table>\
                <table id=board><tr><td>1</td><td>P</td><td>2</td></tr></table>";
    let options = ExtractOptions {
        row_selector: "table#board tr".to_string(),
        ..ExtractOptions::default()
    };
    let rows = extract_table(BoardTable::Results, body, &options).unwrap();
    assert_eq!(rows.table(), BoardTable::Results);
    assert_eq!(rows.len(), 1);
}

#[test]
fn table_rows_convert_to_snapshot() {
    let body = "<table><tr><td>1</td><td>P</td><td>2</td><td>3.5</td><td>3.0</td></tr></table>";
    let rows = extract_table(BoardTable::Results, body, &ExtractOptions::default()).unwrap();
    let taken_at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
    let snapshot = rows.to_snapshot(taken_at, 310).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.min_refresh_period, 310);
    assert_eq!(snapshot.entries[0]["nameFormatted"], "P");
    assert_eq!(snapshot.entries[0]["averageFinished"], 3.0);
}

#[test]
fn non_finite_average_is_rejected() {
    for value in ["NaN", "inf", "-infinity"] {
        let html = page(&format!(
            "<tr><td>1</td><td><a>P</a></td><td>2</td><td>{value}</td><td>1.0</td></tr>"
        ));
        let err = extract_results(&html, &ExtractOptions::default()).unwrap_err();
        assert!(
            matches!(err, ExtractError::InvalidNumber { column: 3, ref value, .. } if value != "1.0"),
            "got: {err:?}"
        );
    }
}

#[test]
fn nan_karma_is_rejected() {
    let row = map_row("<a>Name</a><a href=?uid=U1>x</a>").replace("<td>87.5</td>", "<td>NaN</td>");
    let err = extract_maps(&page(&row), &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::InvalidNumber { column: 5, ref value, .. } if value == "NaN"),
        "got: {err:?}"
    );
}

#[test]
fn karma_above_one_hundred_is_rejected() {
    let row = map_row("<a>Name</a><a href=?uid=U1>x</a>").replace("<td>87.5</td>", "<td>150%</td>");
    let err = extract_maps(&page(&row), &ExtractOptions::default()).unwrap_err();
    assert!(
        matches!(err, ExtractError::InvalidNumber { column: 5, ref value, .. } if value == "150"),
        "got: {err:?}"
    );
}

#[test]
fn karma_bounds_are_inclusive() {
    for karma in ["0", "100"] {
        let row = map_row("<a>Name</a><a href=?uid=U1>x</a>")
            .replace("<td>87.5</td>", &format!("<td>{karma}</td>"));
        let rows = extract_maps(&page(&row), &ExtractOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}

#[test]
fn maps_snapshot_decodes_back_into_rows() {
    let body = format!("<table>{}</table>", map_row("<a>Name</a><a href=?uid=U1>x</a>"));
    let rows = extract_table(BoardTable::Maps, &body, &ExtractOptions::default()).unwrap();
    let taken_at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
    let snapshot = rows.to_snapshot(taken_at, 310).unwrap();

    let decoded: Vec<MapRow> = snapshot.entries_as().unwrap();
    assert_eq!(TableRows::Maps(decoded), rows);
}

#[test]
fn rows_of_a_table_inside_a_cell_are_ignored() {
    let html = page(
        "<tr><td>1</td><td><a>Player</a><table><tr><td>badge</td></tr></table></td>\
         <td>5</td></tr>\
         <tr><td>2</td><td><a>Other</a></td><td>3</td></tr>",
    );
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    let ranks: Vec<u32> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
    assert_eq!(rows[0].nickname, "Player");
}

#[test]
fn nickname_matches_markup_text() {
    let html = page(
        "<tr><td>1</td><td><a><span style='color:#ff0000'>R<span style='color:#00ff00'>G</span></span>b</a></td>\
         <td>5</td></tr>",
    );
    let rows = extract_results(&html, &ExtractOptions::default()).unwrap();
    assert_eq!(rows[0].nickname, "RGb");
    assert_eq!(rows[0].name_formatted, "$<$f00R$>$<$0f0G$>b");
}
