//! Repair of OFX 1.x SGML tag soup into well-formed markup, and a small
//! index-based tree over the result.

use thiserror::Error;

use crate::util::re;

re!(re_tag, r"<(/)?([A-Za-z][A-Za-z0-9_.\-]*)[^<>]*?(/)?>");
re!(re_ofx_start, r"(?i)<OFX[\s>]");

/// Elements that carry a value and never contain children. In SGML OFX
/// these are routinely left unclosed.
pub const LEAF_TAGS: &[&str] = &[
    "ACCTID", "ACCTKEY", "ACCTTYPE", "APPID", "APPVER", "BALAMT", "BANKID", "BRANCHID",
    "CHECKNUM", "CLTCOOKIE", "CODE", "CORRECTACTION", "CORRECTFITID", "CURDEF", "CURRATE",
    "CURSYM", "DTACCTUP", "DTASOF", "DTAVAIL", "DTEND", "DTPOSTED", "DTPROFUP", "DTSERVER",
    "DTSTART", "DTUSER", "EXTDNAME", "FID", "FITID", "INTU.BID", "INTU.USERID", "LANGUAGE",
    "MEMO", "MESSAGE", "NAME", "ORG", "PAYEEID", "REFNUM", "SESSCOOKIE", "SEVERITY", "SIC",
    "SRVRTID", "TRNAMT", "TRNTYPE", "TRNUID", "USERID",
];

fn is_leaf(tag: &str) -> bool {
    LEAF_TAGS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open(&'a str),
    Close(&'a str),
    Empty(&'a str),
    Text(&'a str),
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    fn push_text<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str) {
        let text = text.trim();
        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
    }

    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in re_tag().captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut tokens, &s[last..whole.start()]);
        let name = caps.get(2).map_or("", |m| m.as_str());
        tokens.push(if caps.get(1).is_some() {
            Token::Close(name)
        } else if caps.get(3).is_some() {
            Token::Empty(name)
        } else {
            Token::Open(name)
        });
        last = whole.end();
    }
    push_text(&mut tokens, &s[last..]);
    tokens
}

/// Rewrites SGML OFX into well-formed markup.
///
/// Everything before the first `<OFX` is dropped. Known leaf tags become
/// complete elements; other opening tags are containers tracked on a stack.
/// A closing tag pops the stack and whatever is still open at the end is
/// closed innermost first. Closing tags are emitted as written, so a file
/// whose closing tags disagree with the open containers still produces
/// markup that fails [`Tree::parse`].
pub fn repair(content: &str) -> String {
    let body = match re_ofx_start().find(content) {
        Some(m) => &content[m.start()..],
        None => content,
    };

    let mut out = String::with_capacity(body.len() + body.len() / 4);
    let mut stack: Vec<String> = Vec::new();

    for line in body.lines() {
        let tokens = tokenize(line);
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Open(name) => {
                    let tag = name.to_ascii_uppercase();
                    let text = match tokens.get(i + 1) {
                        Some(Token::Text(t)) => Some(*t),
                        _ => None,
                    };
                    let after = i + 1 + usize::from(text.is_some());
                    let closed_here = matches!(
                        tokens.get(after),
                        Some(Token::Close(c)) if c.eq_ignore_ascii_case(name)
                    );

                    if is_leaf(&tag) || closed_here {
                        out.push_str(&format!("<{tag}>{}</{tag}>", text.unwrap_or("")));
                        i = after + usize::from(closed_here);
                    } else {
                        out.push_str(&format!("<{tag}>"));
                        stack.push(tag);
                        i += 1;
                    }
                }
                Token::Close(name) => {
                    let tag = name.to_ascii_uppercase();
                    // Leaves were already closed when they were opened.
                    if !is_leaf(&tag) {
                        out.push_str(&format!("</{tag}>"));
                        stack.pop();
                    }
                    i += 1;
                }
                Token::Empty(name) => {
                    let tag = name.to_ascii_uppercase();
                    out.push_str(&format!("<{tag}></{tag}>"));
                    i += 1;
                }
                Token::Text(text) => {
                    out.push_str(text);
                    i += 1;
                }
            }
        }
        out.push('\n');
    }

    while let Some(tag) = stack.pop() {
        out.push_str(&format!("</{tag}>\n"));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SgmlError {
    #[error("Closing tag </{found}> does not match open <{expected}>")]
    Mismatched { expected: String, found: String },
    #[error("Closing tag </{0}> with nothing open")]
    UnexpectedClose(String),
    #[error("Element <{0}> never closed")]
    Unclosed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub text: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena of nodes in document order; index 0 is a synthetic root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Strict parse: every closing tag must match the innermost open element.
    pub fn parse(markup: &str) -> Result<Tree, SgmlError> {
        let mut nodes = vec![Node {
            name: String::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }];
        let mut open: Vec<usize> = vec![0];

        for token in tokenize(markup) {
            let top = *open.last().unwrap_or(&0);
            match token {
                Token::Open(name) | Token::Empty(name) => {
                    let id = nodes.len();
                    nodes.push(Node {
                        name: name.to_ascii_uppercase(),
                        text: String::new(),
                        parent: Some(NodeId(top)),
                        children: Vec::new(),
                    });
                    nodes[top].children.push(NodeId(id));
                    if matches!(token, Token::Open(_)) {
                        open.push(id);
                    }
                }
                Token::Close(name) => {
                    if open.len() == 1 {
                        return Err(SgmlError::UnexpectedClose(name.to_string()));
                    }
                    if !nodes[top].name.eq_ignore_ascii_case(name) {
                        return Err(SgmlError::Mismatched {
                            expected: nodes[top].name.clone(),
                            found: name.to_string(),
                        });
                    }
                    open.pop();
                }
                Token::Text(text) => {
                    let node = &mut nodes[top];
                    if !node.text.is_empty() {
                        node.text.push(' ');
                    }
                    node.text.push_str(&decode_entities(text));
                }
            }
        }

        if open.len() > 1 {
            let idx = open[open.len() - 1];
            return Err(SgmlError::Unclosed(nodes[idx].name.clone()));
        }
        Ok(Tree { nodes })
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Every element whose name is in `names`, in document order.
    pub fn find_all(&self, names: &[&str]) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&i| names.iter().any(|n| self.nodes[i].name.eq_ignore_ascii_case(n)))
            .map(NodeId)
            .collect()
    }

    /// Text of the first element named `name` anywhere in the document.
    pub fn first_text(&self, name: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name) && !n.text.is_empty())
            .map(|n| n.text.as_str())
    }

    /// Text of the direct child of `id` named `name`, when non-empty.
    pub fn child_text(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .children
            .iter()
            .map(|&c| self.node(c))
            .find(|n| n.name.eq_ignore_ascii_case(name))
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_dropped_and_leaves_closed() {
        let input = "OFXHEADER:100\nDATA:OFXSGML\n\n<OFX>\n<SIGNONMSGSRSV1>\n<SONRS>\n<DTSERVER>20240131\n</SONRS>\n</SIGNONMSGSRSV1>\n</OFX>\n";
        let out = repair(input);
        assert!(out.starts_with("<OFX>"));
        assert!(out.contains("<DTSERVER>20240131</DTSERVER>"));
        assert!(Tree::parse(&out).is_ok());
    }

    #[test]
    fn empty_leaf_becomes_empty_element() {
        let out = repair("<OFX>\n<STMTTRN>\n<MEMO>\n</STMTTRN>\n</OFX>");
        assert!(out.contains("<MEMO></MEMO>"));
    }

    #[test]
    fn unclosed_containers_closed_innermost_first() {
        let out = repair("<OFX>\n<BANKMSGSRSV1>\n<STMTTRNRS>\n<TRNUID>1");
        assert!(out.trim_end().ends_with("</STMTTRNRS>\n</BANKMSGSRSV1>\n</OFX>"));
        assert!(Tree::parse(&out).is_ok());
    }

    #[test]
    fn inline_closed_elements_kept() {
        let out = repair(
            "<OFX><STMTTRN><TRNTYPE>CREDIT</TRNTYPE><DTPOSTED>20240115</DTPOSTED><TRNAMT>500.00</TRNAMT><NAME>Salary</NAME></STMTTRN></OFX>",
        );
        let tree = Tree::parse(&out).unwrap();
        let trn = tree.find_all(&["STMTTRN"]);
        assert_eq!(trn.len(), 1);
        assert_eq!(tree.child_text(trn[0], "TRNTYPE"), Some("CREDIT"));
        assert_eq!(tree.child_text(trn[0], "NAME"), Some("Salary"));
    }

    #[test]
    fn unknown_tag_with_explicit_close_is_element() {
        let out = repair("<OFX>\n<X-CUSTOM>abc</X-CUSTOM>\n</OFX>");
        assert!(Tree::parse(&out).is_ok());
    }

    #[test]
    fn mismatched_close_fails_strict_parse() {
        // The second STMTTRN opens inside the first because </STMTTRN> is missing,
        // so </BANKTRANLIST> arrives while a STMTTRN is still innermost.
        let out = repair(
            "<OFX>\n<BANKTRANLIST>\n<STMTTRN>\n<TRNAMT>1\n<STMTTRN>\n<TRNAMT>2\n</BANKTRANLIST>\n</OFX>",
        );
        assert!(matches!(Tree::parse(&out), Err(SgmlError::Mismatched { .. })));
    }

    #[test]
    fn strict_parse_errors() {
        assert!(matches!(Tree::parse("</A>"), Err(SgmlError::UnexpectedClose(_))));
        assert!(matches!(Tree::parse("<A><B></A>"), Err(SgmlError::Mismatched { .. })));
        assert!(matches!(Tree::parse("<A>"), Err(SgmlError::Unclosed(_))));
    }

    #[test]
    fn tree_indices_follow_document_order() {
        let tree = Tree::parse("<A><B>1</B><C><B>2</B></C></A>").unwrap();
        let bs = tree.find_all(&["B"]);
        assert_eq!(bs.len(), 2);
        assert_eq!(tree.node(bs[0]).text, "1");
        assert_eq!(tree.node(bs[1]).text, "2");
        let c = tree.node(bs[1]).parent.unwrap();
        assert_eq!(tree.node(c).name, "C");
        assert_eq!(tree.node(NodeId(0)).children.len(), 1);
    }

    #[test]
    fn entities_decoded() {
        let tree = Tree::parse("<NAME>AT&amp;T &lt;online&gt;</NAME>").unwrap();
        assert_eq!(tree.first_text("NAME"), Some("AT&T <online>"));
    }
}
