use anyhow::Result;
use scraper::Html;
use tender_scraper::listing::{ListingEntry, ListingParser};

const LISTING_URL: &str = "https://eproc.example.gov.in/EPSV2Web/openarea/tenderListingPage.action";
const ROWS: &str = "#latestTenders table tbody tr";

fn listing(rows: &str) -> String {
    format!(
        r##"<html><body>
        <ul><li><a href="#latestTenders">Latest Tenders</a></li></ul>
        <div id="latestTenders"><table>
          <thead><tr><th>#</th><th>Tender No</th><th>Title</th><th>Department</th></tr></thead>
          <tbody>{rows}</tbody>
        </table></div>
        </body></html>"##
    )
}

fn tenders(parser: &ListingParser, html: &str) -> Vec<ListingEntry> {
    let doc = Html::parse_document(html);
    parser.rows(&doc).collect()
}

#[test]
fn extracts_fields_by_column_position() -> Result<()> {
    let parser = ListingParser::new(ROWS, LISTING_URL)?;
    let html = listing(
        r#"<tr>
            <td>1</td><td> BR/PWD/2024/17 </td><td>Road repair</td><td>Public Works</td>
            <td>12-03-2024</td><td>30-03-2024 17:00</td><td>Open</td><td>₹1,000,000</td>
            <td><a href="tenderDetail.action?id=17">View</a></td>
        </tr>"#,
    );

    let entries = tenders(&parser, &html);
    assert_eq!(entries.len(), 1);
    let ListingEntry::Tender(row) = &entries[0] else {
        panic!("expected a tender row");
    };

    assert_eq!(row.index, 0);
    assert_eq!(row.tender_number, "BR/PWD/2024/17");
    assert_eq!(row.title, "Road repair");
    assert_eq!(row.department, "Public Works");
    assert_eq!(row.publish_date_raw, "12-03-2024");
    assert_eq!(row.bid_submission_date_raw, "30-03-2024 17:00");
    assert_eq!(row.tender_value_raw, "₹1,000,000");
    assert_eq!(
        row.detail_url.as_deref(),
        Some("https://eproc.example.gov.in/EPSV2Web/openarea/tenderDetail.action?id=17")
    );
    Ok(())
}

#[test]
fn short_rows_are_reported_but_not_parsed() -> Result<()> {
    let parser = ListingParser::new(ROWS, LISTING_URL)?;
    let html = listing(
        r#"<tr><td>1</td><td>A-1</td><td>T</td><td>D</td><td>01-01-2024</td></tr>
           <tr><td colspan="4">No more tenders</td></tr>
           <tr><td>3</td><td>A-3</td><td>T</td><td>D</td></tr>"#,
    );

    let entries = tenders(&parser, &html);
    assert_eq!(entries.len(), 3);
    assert!(matches!(&entries[0], ListingEntry::Tender(row) if row.tender_number == "A-1"));
    assert_eq!(entries[1], ListingEntry::Incomplete { index: 1, cells: 1 });
    assert_eq!(entries[2], ListingEntry::Incomplete { index: 2, cells: 4 });

    let ListingEntry::Tender(first) = &entries[0] else {
        panic!("expected a tender row");
    };
    assert_eq!(first.bid_submission_date_raw, "");
    assert_eq!(first.tender_value_raw, "");
    assert_eq!(first.detail_url, None);
    Ok(())
}

#[test]
fn detail_url_from_onclick_literal() -> Result<()> {
    let parser = ListingParser::new(ROWS, LISTING_URL)?;
    let html = listing(
        r#"<tr><td>1</td><td>A-1</td><td>T</td><td>D</td><td>-</td>
             <td><button onclick="openDetail('/EPSV2Web/openarea/detail.action?tid=9')">View</button></td></tr>
           <tr><td>2</td><td>A-2</td><td>T</td><td>D</td><td>-</td>
             <td><a onclick='window.open("detail.action?tid=10")'>View</a></td></tr>"#,
    );

    let urls = tenders(&parser, &html)
        .into_iter()
        .filter_map(|entry| match entry {
            ListingEntry::Tender(row) => row.detail_url,
            ListingEntry::Incomplete { .. } => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(
        urls,
        vec![
            "https://eproc.example.gov.in/EPSV2Web/openarea/detail.action?tid=9".to_string(),
            "https://eproc.example.gov.in/EPSV2Web/openarea/detail.action?tid=10".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn script_scheme_href_is_unwrapped() -> Result<()> {
    let parser = ListingParser::new(ROWS, LISTING_URL)?;
    let html = listing(
        r#"<tr><td>1</td><td>A-1</td><td>T</td><td>D</td><td>-</td>
             <td><a href="javascript:showTender('https://other.example.org/t/1')">View</a></td></tr>
           <tr><td>2</td><td>A-2</td><td>T</td><td>D</td><td>-</td>
             <td><a href="javascript:void(0)">View</a></td></tr>"#,
    );

    let entries = tenders(&parser, &html);
    let urls = entries
        .iter()
        .map(|entry| match entry {
            ListingEntry::Tender(row) => row.detail_url.clone(),
            ListingEntry::Incomplete { .. } => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(
        urls,
        vec![Some("https://other.example.org/t/1".to_string()), None]
    );
    Ok(())
}

#[test]
fn rows_outside_the_container_are_ignored() -> Result<()> {
    let parser = ListingParser::new(ROWS, LISTING_URL)?;
    let html = r#"<html><body>
        <table><tbody><tr><td>1</td><td>X</td><td>T</td><td>D</td><td>-</td></tr></tbody></table>
        <div id="latestTenders"><table><tbody>
          <tr><td>1</td><td>Y</td><td>T</td><td>D</td><td>-</td></tr>
        </tbody></table></div></body></html>"#;

    let entries = tenders(&parser, html);
    assert_eq!(entries.len(), 1);
    assert!(matches!(&entries[0], ListingEntry::Tender(row) if row.tender_number == "Y"));
    Ok(())
}

#[test]
fn invalid_row_selector_is_rejected() {
    assert!(ListingParser::new("tr[", LISTING_URL).is_err());
    assert!(ListingParser::new(ROWS, "not a url").is_err());
}
