use crate::processing::CodeTable;

/// Turns Chinese Commercial Codes into ideographs. Unknown codes decode to an
/// empty string so that one bad group never stops the rest of the name.
#[derive(Debug, Clone, Copy)]
pub struct CccDecoder<'a> {
    table: &'a CodeTable,
}

impl<'a> CccDecoder<'a> {
    pub fn new(table: &'a CodeTable) -> Self {
        CccDecoder { table }
    }

    pub fn decode(&self, code: u32) -> String {
        let key = format!("{:04}", code);
        match self.table.get(&key) {
            Some(text) => text.to_string(),
            None => {
                log::debug!("No ideograph for code {}", key);
                String::new()
            }
        }
    }

    pub fn decode_all(&self, codes: &[u32]) -> String {
        codes.iter().map(|code| self.decode(*code)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CodeTable {
        CodeTable::from_entries([("7115", "陳"), ("1129", "大"), ("2429", "文"), ("0022", "中")])
    }

    #[test]
    fn test_decodes_known_sequence() {
        let table = table();
        let decoder = CccDecoder::new(&table);
        assert_eq!(decoder.decode_all(&[7115, 1129, 2429]), "陳大文");
    }

    #[test]
    fn test_pads_short_codes() {
        let table = table();
        assert_eq!(CccDecoder::new(&table).decode(22), "中");
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let table = table();
        let decoder = CccDecoder::new(&table);
        assert_eq!(decoder.decode(9999), "");
        assert_eq!(decoder.decode(12345), "");
        assert_eq!(decoder.decode_all(&[7115, 9999, 2429]), "陳文");
    }
}
