use itertools::Itertools;
use std::path::Path;

use crate::error::{Error, ParseErrorKind, Result};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DecklistEntry {
    pub quantity: u32,
    pub name: String,
}

impl DecklistEntry {
    pub fn new(quantity: u32, name: &str) -> DecklistEntry {
        DecklistEntry {
            quantity,
            name: name.to_string(),
        }
    }
}

/// The cards of one deck in file order. Lines naming the same card stay
/// separate entries, they only share the downloaded image.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Decklist {
    pub entries: Vec<DecklistEntry>,
}

impl Decklist {
    pub fn from_file(path: &Path) -> Result<Decklist> {
        let text = std::fs::read_to_string(path).map_err(Error::io(path))?;
        parse_decklist(&text)
    }

    /// Number of physical cards, i.e. the sum of all quantities.
    pub fn card_count(&self) -> usize {
        self.entries.iter().map(|e| e.quantity as usize).sum()
    }

    pub fn distinct_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str()).unique()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_quantity(field: &str) -> std::result::Result<u32, ParseErrorKind> {
    let invalid = || ParseErrorKind::InvalidQuantity(field.to_string());
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match field.parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(quantity) => Ok(quantity),
    }
}

/// Parses one `<quantity>\t<name>` record. Only the line ending is removed,
/// whitespace inside and around the name is kept as written.
pub fn parse_line(line: &str) -> std::result::Result<DecklistEntry, ParseErrorKind> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let (quantity, name) = line.split_once('\t').ok_or(ParseErrorKind::MissingTab)?;
    let quantity = parse_quantity(quantity)?;
    if name.trim().is_empty() {
        return Err(ParseErrorKind::EmptyName);
    }
    Ok(DecklistEntry::new(quantity, name))
}

pub fn parse_decklist(decklist: &str) -> Result<Decklist> {
    let entries = decklist
        .split('\n')
        .enumerate()
        .filter(|(_, s)| !s.trim().is_empty())
        .map(|(i, s)| parse_line(s).map_err(|kind| Error::Parse { line: i + 1, kind }))
        .collect::<Result<Vec<_>>>()?;
    Ok(Decklist { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error(s: &str) -> (usize, ParseErrorKind) {
        match parse_decklist(s) {
            Err(Error::Parse { line, kind }) => (line, kind),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn number_name() {
        assert_eq!(
            parse_line("2\tplains\n").unwrap(),
            DecklistEntry::new(2, "plains")
        );
    }

    #[test]
    fn keeps_whitespace_in_name() {
        assert_eq!(
            parse_line("1\t Jace,  the Mind Sculptor \r\n").unwrap(),
            DecklistEntry::new(1, " Jace,  the Mind Sculptor ")
        );
    }

    #[test]
    fn split_card() {
        assert_eq!(
            parse_line("1\tCut // Ribbons").unwrap(),
            DecklistEntry::new(1, "Cut // Ribbons")
        );
    }

    #[test]
    fn only_first_tab_separates() {
        assert_eq!(
            parse_line("3\tOdd\tName").unwrap(),
            DecklistEntry::new(3, "Odd\tName")
        );
    }

    #[test]
    fn whole_list() {
        let decklist = "4\tLovestruck Beast\n1\tThe Great Henge\n\n20\tForest\n";
        let parsed = parse_decklist(decklist).unwrap();
        assert_eq!(
            parsed.entries,
            vec![
                DecklistEntry::new(4, "Lovestruck Beast"),
                DecklistEntry::new(1, "The Great Henge"),
                DecklistEntry::new(20, "Forest"),
            ]
        );
        assert_eq!(parsed.card_count(), 25);
    }

    #[test]
    fn repeated_names_stay_separate() {
        let parsed = parse_decklist("2\tShock\n1\tOpt\n2\tShock").unwrap();
        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.distinct_names().collect::<Vec<_>>(), vec!["Shock", "Opt"]);
    }

    #[test]
    fn missing_tab() {
        assert_eq!(parse_error("1\tOpt\n4 Shock\n"), (2, ParseErrorKind::MissingTab));
    }

    #[test]
    fn bad_quantities() {
        for q in ["0", "-1", "abc", "", "+2", "99999999999"] {
            assert_eq!(
                parse_error(&format!("{}\tFoo", q)),
                (1, ParseErrorKind::InvalidQuantity(q.to_string()))
            );
        }
    }

    #[test]
    fn empty_name() {
        assert_eq!(parse_error("\n\n3\t\n"), (3, ParseErrorKind::EmptyName));
    }

    #[test]
    fn empty_input() {
        assert!(parse_decklist("").unwrap().is_empty());
    }
}
