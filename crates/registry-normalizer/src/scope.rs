//! Business scope splitting.

const SEPARATORS: [char; 6] = [';', '；', '、', '，', ',', '\n'];

/// Split a business-scope string into trimmed, distinct items longer than
/// two characters, in first-seen order.
pub fn split_scope(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(SEPARATORS.as_slice()) {
        let item = item.trim();
        if item.chars().count() > 2 && !items.iter().any(|seen| seen == item) {
            items.push(item.to_string());
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mixed_separators() {
        let items = split_scope("技术开发；技术咨询、软件销售,计算机系统服务\n数据处理");
        assert_eq!(
            items,
            vec!["技术开发", "技术咨询", "软件销售", "计算机系统服务", "数据处理"]
        );
    }

    #[test]
    fn test_short_and_duplicate_items_dropped() {
        let items = split_scope("技术开发; 技术开发 ;咨询;  ;软件销售");
        assert_eq!(items, vec!["技术开发", "软件销售"]);
    }

    #[test]
    fn test_empty() {
        assert!(split_scope("").is_empty());
        assert!(split_scope("；；").is_empty());
    }
}
