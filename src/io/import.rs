use serde_json::{Map, Number, Value};

use crate::application::AppError;
use crate::domain::{TransactionRecord, check_identifiers};
use crate::io::export::{OutputFormat, ReportEntry};

/// Declaration holding the report in a generated TypeScript module.
const REPORT_SUFFIX: &str = "StaticReport";

/// Parse a generated artifact back into its report tree.
pub fn read_report(text: &str, format: OutputFormat) -> Result<ReportEntry, AppError> {
    let tree = match format {
        OutputFormat::Json => {
            serde_json::from_str(text).map_err(|e| AppError::InvalidArtifact(e.to_string()))?
        }
        OutputFormat::TypeScript => {
            let start = report_literal_start(text)?;
            let mut parser = LiteralParser::new(&text[start..]);
            parser.parse_value()?
        }
    };

    serde_json::from_value(tree).map_err(|e| AppError::InvalidArtifact(e.to_string()))
}

/// Read the transactions of a generated artifact and check their identifiers.
pub fn read_transactions(
    text: &str,
    format: OutputFormat,
) -> Result<Vec<TransactionRecord>, AppError> {
    transactions_of(&read_report(text, format)?)
}

/// Convert the transactions of an already parsed report and check their identifiers.
pub fn transactions_of(report: &ReportEntry) -> Result<Vec<TransactionRecord>, AppError> {
    let records = report
        .transactions
        .iter()
        .cloned()
        .map(TransactionRecord::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::InvalidArtifact)?;

    check_identifiers(&records).map_err(|e| AppError::InvalidArtifact(e.to_string()))?;
    Ok(records)
}

/// Parse a complete JavaScript object literal (an optional trailing `;` is allowed).
pub fn parse_literal(text: &str) -> Result<Value, AppError> {
    let mut parser = LiteralParser::new(text);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    parser.eat(';');
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

fn report_literal_start(text: &str) -> Result<usize, AppError> {
    let decl = text
        .match_indices("export const ")
        .map(|(idx, keyword)| idx + keyword.len())
        .find(|&start| {
            let name: String = text[start..].chars().take_while(|c| is_ident_char(*c)).collect();
            name.ends_with(REPORT_SUFFIX)
        })
        .ok_or_else(|| AppError::InvalidArtifact(format!("no *{} declaration", REPORT_SUFFIX)))?;
    let eq = text[decl..]
        .find('=')
        .ok_or_else(|| AppError::InvalidArtifact("declaration has no initializer".into()))?;
    Ok(decl + eq + 1)
}

/// Recursive-descent parser for the object-literal subset the exporter writes:
/// objects, arrays, quoted strings, numbers, `true`/`false`/`null`, comments and trailing commas.
struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, msg: &str) -> AppError {
        AppError::InvalidArtifact(format!("{} at character {}", msg, self.pos))
    }

    fn expect(&mut self, expected: char) -> Result<(), AppError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn skip_trivia(&mut self) -> Result<(), AppError> {
        loop {
            match (self.peek(), self.chars.get(self.pos + 1).copied()) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match self.bump() {
                            Some('*') => {
                                if self.eat('/') {
                                    break;
                                }
                            }
                            Some(_) => {}
                            None => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, AppError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                Ok(Value::String(self.parse_string(q)?))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if is_ident_char(c) => match self.parse_word().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(self.error(&format!("unexpected word '{}'", other))),
            },
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, AppError> {
        self.expect('{')?;
        let mut fields = Map::new();
        loop {
            self.skip_trivia()?;
            if self.eat('}') {
                return Ok(Value::Object(fields));
            }
            let key = match self.peek() {
                Some(q @ ('\'' | '"')) => {
                    self.pos += 1;
                    self.parse_string(q)?
                }
                Some(c) if is_ident_char(c) => self.parse_word(),
                _ => return Err(self.error("expected property name")),
            };
            self.skip_trivia()?;
            self.expect(':')?;
            let value = self.parse_value()?;
            fields.insert(key, value);

            self.skip_trivia()?;
            if !self.eat(',') {
                self.skip_trivia()?;
                self.expect('}')?;
                return Ok(Value::Object(fields));
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, AppError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);

            self.skip_trivia()?;
            if !self.eat(',') {
                self.skip_trivia()?;
                self.expect(']')?;
                return Ok(Value::Array(items));
            }
        }
    }

    /// Body of a string whose opening quote was consumed.
    fn parse_string(&mut self, quote: char) -> Result<String, AppError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\n') => return Err(self.error("line break inside string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => out.push(self.parse_unicode_escape()?),
                    Some(c @ ('\\' | '\'' | '"' | '/')) => out.push(c),
                    Some(c) => return Err(self.error(&format!("unsupported escape '\\{}'", c))),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, AppError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("bad unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value, AppError> {
        let start = self.pos;
        self.eat('-');
        let mut fractional = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' | '+' => fractional = true,
                '-' if fractional => {}
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        if !fractional {
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(&format!("bad number '{}'", text)))
    }

    fn parse_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionType;
    use crate::io::export::TransactionEntry;
    use serde_json::json;

    #[test]
    fn test_parse_literal_subset() {
        let value = parse_literal(
            "{\n  // comment\n  name: 'O\\'Brien',\n  'odd-key': \"x\",\n  n: -42,\n  f: 1.5,\n  list: [1, 2,],\n  /* block */ ok: true,\n  none: null,\n};",
        )
        .unwrap();

        assert_eq!(
            value,
            json!({
                "name": "O'Brien",
                "odd-key": "x",
                "n": -42,
                "f": 1.5,
                "list": [1, 2],
                "ok": true,
                "none": null,
            })
        );
    }

    #[test]
    fn test_parse_literal_escapes() {
        let value = parse_literal(r"['a\\b', 'tab\there', 'é', 'x\/y']").unwrap();
        assert_eq!(value, json!(["a\\b", "tab\there", "é", "x/y"]));
    }

    #[test]
    fn test_parse_literal_rejects_malformed_input() {
        assert!(parse_literal("{ name: 'unterminated }").is_err());
        assert!(parse_literal("{ name 'x' }").is_err());
        assert!(parse_literal("[1, 2] extra").is_err());
        assert!(parse_literal("{ name: undefined }").is_err());
        assert!(parse_literal("'line\nbreak'").is_err());
    }

    #[test]
    fn test_transactions_of_parsed_report() {
        let text = "export const asoStaticReport = {
  politician: { name: '麻生太郎', organization: '素淮会', fiscalYear: '2023', party: '自民', hereditary: '4代目' },
  summary: { incomeTotal: 1, expenseTotal: 1, thisYearExpense: 1, balance: 0, carriedFromPrevYear: 0, carriedToNextYear: 0 },
  income: { categories: [], total: 1 },
  expenses: { categories: [], total: 1 },
  transactions: [
    { id: 'expense-0', type: 'expense', category: '会合', subcategory: '', description: '料亭', recipient: '料亭', amount: 30000, date: '2023-04-01', location: '', url: '' },
    { id: 'income-0', type: 'income', category: '寄附', subcategory: '', description: 'A', recipient: 'A', amount: 1, date: '2023-05-01', location: '', url: '' },
  ],
};";
        let report = read_report(text, OutputFormat::TypeScript).unwrap();

        let records = transactions_of(&report).unwrap();

        assert_eq!(records.len(), report.transactions.len());
        assert_eq!(records[0].id.to_string(), "expense-0");
        assert_eq!(records[0].counterparty, "料亭");
        assert!(records[1].is_income());
    }

    #[test]
    fn test_transactions_of_rejects_mismatched_type() {
        let mut report = read_report(
            "export const aStaticReport = { politician: { name: 'a', organization: 'b', fiscalYear: '2023', party: 'c', hereditary: 'd' }, summary: { incomeTotal: 0, expenseTotal: 0, thisYearExpense: 0, balance: 0, carriedFromPrevYear: 0, carriedToNextYear: 0 }, income: { categories: [], total: 0 }, expenses: { categories: [], total: 0 }, transactions: [] };",
            OutputFormat::TypeScript,
        )
        .unwrap();
        assert!(transactions_of(&report).unwrap().is_empty());

        report.transactions.push(TransactionEntry {
            id: "income-0".into(),
            kind: TransactionType::Expense,
            category: String::new(),
            subcategory: String::new(),
            description: String::new(),
            recipient: String::new(),
            amount: 1,
            date: "2023-01-01".into(),
            location: String::new(),
            url: String::new(),
        });
        assert!(matches!(
            transactions_of(&report),
            Err(AppError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_report_literal_start_requires_declaration() {
        assert!(report_literal_start("export const x = {};").is_err());
        let text = "export const asoStaticReport: Omit<A, 'b'> = { };";
        let start = report_literal_start(text).unwrap();
        assert_eq!(text[start..].trim_start(), "{ };");
    }
}
