//! Outline reconciliation for Org documents.
//! Headings live in an injected record store; local edits against them are expressed as
//! typed edit operations that a text rewriter applies to the canonical Org text.

pub mod core {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /* ------------------------------- IDs ------------------------------- */

    /// Store-assigned node id.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct NodeId(pub u64);

    impl fmt::Display for NodeId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DocumentId(pub u64);

    impl fmt::Display for DocumentId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /* ------------------------------ Entities ------------------------------ */

    /// A heading in the outline tree, as held by the record store.
    ///
    /// Navigation and persistence live in [`crate::node`]; markup rendering in
    /// [`crate::format`]. The structured view of `body` is recomputed on demand by
    /// [`OutlineNode::payload`], so reassigning `body` never leaves stale state behind.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct OutlineNode {
        /// `None` until the first write.
        pub id: Option<NodeId>,
        /// `None` for a document's root container.
        pub parent_id: Option<NodeId>,
        pub document_id: Option<DocumentId>,

        /// Heading depth; document roots sit at 0 so top-level headings are 1.
        pub level: u8,
        /// Order among siblings, unique per parent.
        pub position: u32,

        pub name: String,
        /// TODO keyword, empty when absent.
        #[serde(default)]
        pub todo: String,
        /// Priority cookie content (`A` for `[#A]`), empty when absent.
        #[serde(default)]
        pub priority: String,
        /// Colon-delimited tags without the outer colons.
        #[serde(default)]
        pub tags: String,
        /// Tags contributed by ancestors; recomputed by the loader, never authored.
        #[serde(default)]
        pub inherited_tags: String,
        /// Raw text following the headline.
        #[serde(default)]
        pub body: String,
    }

    impl OutlineNode {
        pub fn new(level: u8, name: impl Into<String>) -> Self {
            Self {
                level,
                name: name.into(),
                ..Self::default()
            }
        }
    }

    /// A document known to the store, with the synthetic container node that parents
    /// its top-level headings.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DocumentRecord {
        pub id: DocumentId,
        pub name: String,
        pub root: NodeId,
    }

    /* ------------------------------- Tags ------------------------------- */

    /// Split a stored tag string into tokens.
    ///
    /// A trailing colon contributes one trailing empty token: `"a:b:"` gives
    /// `["a", "b", ""]` while `"a:b"` gives `["a", "b"]`.
    pub fn split_tags(tags: &str) -> Vec<String> {
        if tags.is_empty() {
            return vec![];
        }
        let mut out: Vec<String> = tags.split(':').map(str::to_string).collect();
        while out.last().is_some_and(|t| t.is_empty()) {
            out.pop();
        }
        if tags.ends_with(':') {
            out.push(String::new());
        }
        out
    }

    /* ---------------------------- Configuration ---------------------------- */

    /// Settings consulted by editability checks, refiling and capture.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct EditConfig {
        /// Read-only aggregation document assembled from other documents.
        pub agenda_document: String,
        /// Scratch document that stages new content; not backed by markup text yet.
        pub capture_document: String,
        /// Agenda headings starting with this prefix separate blocks and are never editable.
        pub block_separator_prefix: String,
        /// Append an inactive timestamp to captured bodies.
        pub capture_with_timestamp: bool,
        /// Keywords recognised in front of a headline title.
        pub todo_keywords: Vec<String>,
    }

    impl Default for EditConfig {
        fn default() -> Self {
            Self {
                agenda_document: "agendas.org".into(),
                capture_document: "mobileorg.org".into(),
                block_separator_prefix: "#BLOCK:".into(),
                capture_with_timestamp: false,
                todo_keywords: ["TODO", "NEXT", "WAIT", "DONE", "CANCELLED"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }
        }
    }

    /* ---------------------------- Errors (domain) ---------------------------- */

    #[derive(Debug, thiserror::Error)]
    pub enum OutlineError {
        #[error("node not found: {0}")]
        NodeNotFound(String),
        #[error("invalid operation: {0}")]
        InvalidOperation(String),
        #[error("document {0:?} not found")]
        DocumentNotFound(String),
        #[error("text rewrite for {target:?} failed: {reason}")]
        Rewrite { target: String, reason: String },
    }

}

pub mod parser {
    //! `nom` parsers for single headlines and the line-level syntax found in bodies.
    //!
    //! Whole-document parsing belongs to the loader that fills the store; this module only
    //! reads back what [`crate::format`] writes for one node, plus drawer and clock lines.

    use crate::core::OutlineNode;
    use crate::payload::LogbookEntry;
    use anyhow::{Result, anyhow};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::{tag, take_while, take_while1},
        character::complete::{char, line_ending, not_line_ending, space0, space1},
        combinator::{map, map_res, opt},
        error::{VerboseError, VerboseErrorKind},
        sequence::{delimited, preceded, terminated, tuple},
    };

    /* ------------------------ Public entry points ------------------------ */

    /// Parse one node rendered by [`crate::format::serialize_to_markup`]: a headline and,
    /// after the first newline, the verbatim body.
    ///
    /// Only words listed in `todo_keywords` are taken as a TODO keyword.
    pub fn parse_node_markup(input: &str, todo_keywords: &[String]) -> Result<OutlineNode> {
        let (body, mut node) =
            parse_headline(input, todo_keywords).map_err(to_anyhow("headline"))?;
        node.body = body.to_string();
        Ok(node)
    }

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    fn to_anyhow(label: &'static str) -> impl Fn(nom::Err<VerboseError<&str>>) -> anyhow::Error {
        move |e| match e {
            nom::Err::Error(ve) | nom::Err::Failure(ve) => anyhow!(pretty_verbose_error(label, ve)),
            nom::Err::Incomplete(_) => anyhow!("incomplete input while parsing {}", label),
        }
    }

    fn pretty_verbose_error(label: &str, ve: VerboseError<&str>) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(s, "parse error in {}:", label);
        for (frag, kind) in ve.errors {
            let show = frag
                .get(0..frag.find('\n').unwrap_or(frag.len()))
                .unwrap_or(frag);
            let _ = writeln!(s, "  at: {:?}  {:?}", show, kind);
        }
        s
    }

    fn line_ending_ve(i: &str) -> PResult<'_, &str> {
        line_ending::<_, VerboseError<&str>>(i)
    }

    fn is_tag_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '%')
    }

    fn is_property_key_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '+')
    }

    /* ------------------------------ Headline ------------------------------ */

    /// Parse a headline line. Level 0 (no stars) is accepted for staged subtrees.
    fn parse_headline<'a>(i: &'a str, todo_keywords: &[String]) -> PResult<'a, OutlineNode> {
        let (i, stars) = take_while(|c: char| c == '*')(i)?;
        let (i, _) = if stars.is_empty() {
            space0(i)?
        } else {
            space1(i)?
        };

        let (i, todo) = match todo_word(i) {
            Ok((rest, word)) if todo_keywords.iter().any(|k| k == word) => {
                (rest, word.to_string())
            }
            _ => (i, String::new()),
        };

        let (i, priority) = opt(terminated(
            delimited(
                tag("[#"),
                take_while1(|c: char| c != ']' && c != '\n'),
                char(']'),
            ),
            space0,
        ))(i)?;

        let (i, title_line) = not_line_ending(i)?;
        let (i, _) = opt(line_ending_ve)(i)?;
        let (name, tags) = split_title_tags(title_line);

        let mut node = OutlineNode::new(stars.len().min(u8::MAX as usize) as u8, name);
        node.todo = todo;
        node.priority = priority.unwrap_or_default().to_string();
        node.tags = tags.to_string();
        Ok((i, node))
    }

    fn todo_word(i: &str) -> PResult<'_, &str> {
        terminated(take_while1(|c: char| c.is_ascii_uppercase()), space1)(i)
    }

    /// Split `Title :a:b:` into the title and the tag string between the outer colons.
    fn split_title_tags(line: &str) -> (&str, &str) {
        if let Some(pos) = line.rfind(" :") {
            let trail = &line[pos + 1..];
            if trail.len() >= 2
                && trail.ends_with(':')
                && trail.chars().all(|c| c == ':' || is_tag_char(c))
            {
                return (&line[..pos], &trail[1..trail.len() - 1]);
            }
        }
        (line, "")
    }

    /* --------------------------- Drawer lines --------------------------- */

    /// `:KEY: value`, with optional indentation.
    pub(crate) fn parse_property_line(i: &str) -> PResult<'_, (&str, &str)> {
        map(
            tuple((
                space0,
                char(':'),
                take_while1(is_property_key_char),
                char(':'),
                space0,
                not_line_ending,
            )),
            |(_, _, key, _, _, val): (&str, char, &str, char, &str, &str)| (key, val.trim_end()),
        )(i)
    }

    /// `CLOCK: [2025-11-15 Sat 10:00]--[2025-11-15 Sat 11:30] =>  1:30`
    pub(crate) fn parse_clock_line(i: &str) -> PResult<'_, LogbookEntry> {
        let (i, _) = space0(i)?;
        let (i, _) = tag("CLOCK:")(i)?;
        let (i, _) = space1(i)?;
        let (i, start) = parse_timestamp(i)?;
        let (i, end) = opt(preceded(tag("--"), parse_timestamp))(i)?;
        let (i, elapsed) = opt(preceded(
            tuple((space0, tag("=>"), space0)),
            not_line_ending,
        ))(i)?;

        let elapsed = elapsed
            .map(|s: &str| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok((
            i,
            LogbookEntry {
                start,
                end,
                elapsed,
            },
        ))
    }

    /* ----------------------------- Timestamps ----------------------------- */

    /// `[YYYY-MM-DD Day HH:MM]` or `<...>`; day name and time are optional.
    fn parse_timestamp(i: &str) -> PResult<'_, NaiveDateTime> {
        let (i, (_open, date, _day, time, _close)) = tuple((
            alt((char('['), char('<'))),
            parse_date,
            opt(preceded(space1, take_while1(|c: char| c.is_alphabetic()))),
            opt(preceded(space1, parse_time)),
            alt((char(']'), char('>'))),
        ))(i)?;
        Ok((i, date.and_time(time.unwrap_or_default())))
    }

    fn parse_date(i: &str) -> PResult<'_, NaiveDate> {
        map_res(
            tuple((
                map_res(take_while_m_n(4, 4, char_is_digit), |s: &str| {
                    s.parse::<i32>()
                }),
                char('-'),
                map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                    s.parse::<u32>()
                }),
                char('-'),
                map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                    s.parse::<u32>()
                }),
            )),
            |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid date"),
        )(i)
    }

    fn parse_time(i: &str) -> PResult<'_, NaiveTime> {
        map_res(
            tuple((
                map_res(take_while_m_n(1, 2, char_is_digit), |s: &str| {
                    s.parse::<u32>()
                }),
                char(':'),
                map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                    s.parse::<u32>()
                }),
            )),
            |(h, _, m)| NaiveTime::from_hms_opt(h, m, 0).ok_or("invalid time"),
        )(i)
    }

    fn take_while_m_n<F>(m: usize, n: usize, cond: F) -> impl Fn(&str) -> PResult<'_, &str>
    where
        F: Fn(char) -> bool + Copy,
    {
        move |i: &str| {
            let (i, out) = take_while(cond)(i)?;
            if out.len() < m || out.len() > n {
                Err(nom::Err::Error(VerboseError {
                    errors: vec![(i, VerboseErrorKind::Context("m_n"))],
                }))
            } else {
                Ok((i, out))
            }
        }
    }

    fn char_is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

}

pub mod payload {
    //! Structured view of a node body: the property drawer, the logbook and the
    //! identifier property.
    //!
    //! Nothing here fails. A drawer without its `:END:` line is not a drawer, malformed
    //! property lines are skipped, and the text stays available as the cleaned body.
    //! An unmodified payload renders back to exactly the body it was parsed from.

    use crate::parser::{parse_clock_line, parse_property_line};
    use chrono::NaiveDateTime;
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    pub const ID_PROPERTY: &str = "ID";
    pub const ORIGINAL_ID_PROPERTY: &str = "ORIGINAL_ID";

    const PROPERTIES_DRAWER: &str = ":PROPERTIES:";
    const LOGBOOK_DRAWER: &str = ":LOGBOOK:";
    const DRAWER_END: &str = ":END:";

    /// One `CLOCK:` record.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LogbookEntry {
        pub start: NaiveDateTime,
        pub end: Option<NaiveDateTime>,
        /// Elapsed label after `=>`, e.g. `1:30`.
        pub elapsed: Option<String>,
    }

    /// Inclusive line range of a drawer, from its opening line to `:END:`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct LineSpan {
        start: usize,
        end: usize,
    }

    impl LineSpan {
        fn contains(&self, line: usize) -> bool {
            line >= self.start && line <= self.end
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Payload {
        raw: String,
        properties: IndexMap<String, String>,
        logbook: Vec<LogbookEntry>,
        cleaned: String,
        properties_span: Option<LineSpan>,
        logbook_span: Option<LineSpan>,
    }

    impl Payload {
        pub fn parse(body: &str) -> Self {
            let lines: Vec<&str> = body.split('\n').collect();
            let properties_span = find_drawer(&lines, PROPERTIES_DRAWER, None);
            let logbook_span = find_drawer(&lines, LOGBOOK_DRAWER, properties_span);

            let mut properties = IndexMap::new();
            if let Some(span) = properties_span {
                for line in &lines[span.start + 1..span.end] {
                    if let Ok((_, (key, value))) = parse_property_line(line) {
                        properties.insert(key.to_string(), value.to_string());
                    }
                }
            }

            let mut logbook = Vec::new();
            if let Some(span) = logbook_span {
                for line in &lines[span.start + 1..span.end] {
                    if let Ok((_, entry)) = parse_clock_line(line) {
                        logbook.push(entry);
                    }
                }
            }

            let cleaned = if properties_span.is_none() && logbook_span.is_none() {
                body.to_string()
            } else {
                let kept = lines
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| {
                        !properties_span.is_some_and(|s| s.contains(*idx))
                            && !logbook_span.is_some_and(|s| s.contains(*idx))
                    })
                    .map(|(_, line)| *line)
                    .collect::<Vec<_>>()
                    .join("\n");
                kept.trim_start_matches('\n').trim_end().to_string()
            };

            Self {
                raw: body.to_string(),
                properties,
                logbook,
                cleaned,
                properties_span,
                logbook_span,
            }
        }

        pub fn as_body(&self) -> &str {
            &self.raw
        }

        pub fn into_body(self) -> String {
            self.raw
        }

        /// Body text without the property drawer and logbook.
        pub fn cleaned_body(&self) -> &str {
            &self.cleaned
        }

        pub fn properties(&self) -> &IndexMap<String, String> {
            &self.properties
        }

        pub fn property(&self, key: &str) -> Option<&str> {
            self.properties.get(key).map(String::as_str)
        }

        pub fn logbook(&self) -> &[LogbookEntry] {
            &self.logbook
        }

        /// `ID`, falling back to `ORIGINAL_ID`; empty when neither is set.
        pub fn identifier(&self) -> &str {
            [ID_PROPERTY, ORIGINAL_ID_PROPERTY]
                .into_iter()
                .filter_map(|key| self.property(key))
                .find(|value| !value.is_empty())
                .unwrap_or("")
        }

        /// Set a property. Only the line holding `key` changes (or one line is added
        /// before `:END:`); a drawer is created at the top when there is none.
        pub fn set_property(&mut self, key: &str, value: &str) {
            let mut lines = self.raw_lines();
            match self.properties_span {
                Some(span) => {
                    let existing = (span.start + 1..span.end).rev().find(|&idx| {
                        parse_property_line(&lines[idx]).is_ok_and(|(_, (k, _))| k == key)
                    });
                    match existing {
                        Some(idx) => {
                            let indent = leading_whitespace(&lines[idx]).to_string();
                            lines[idx] = property_line(&indent, key, value);
                        }
                        None => {
                            let indent = leading_whitespace(&lines[span.start]).to_string();
                            lines.insert(span.end, property_line(&indent, key, value));
                        }
                    }
                }
                None => {
                    lines.splice(
                        0..0,
                        [
                            PROPERTIES_DRAWER.to_string(),
                            property_line("", key, value),
                            DRAWER_END.to_string(),
                        ],
                    );
                }
            }
            *self = Self::parse(&lines.join("\n"));
        }

        /// Return the identifier, assigning a fresh UUID `ID` first when there is none.
        pub fn ensure_identifier(&mut self) -> String {
            if self.identifier().is_empty() {
                self.set_property(ID_PROPERTY, &Uuid::new_v4().to_string());
            }
            self.identifier().to_string()
        }

        /// Append a clock entry after the existing ones, creating the logbook (below the
        /// property drawer, if any) when missing.
        pub fn add_logbook_entry(
            &mut self,
            start: NaiveDateTime,
            end: NaiveDateTime,
            elapsed: &str,
        ) {
            let entry = format!(
                "CLOCK: {}--{} =>  {}",
                inactive_timestamp(start),
                inactive_timestamp(end),
                elapsed
            );

            let mut lines = self.raw_lines();
            match self.logbook_span {
                Some(span) => {
                    let indent = leading_whitespace(&lines[span.start]).to_string();
                    lines.insert(span.end, format!("{indent}{entry}"));
                }
                None => {
                    let at = self.properties_span.map_or(0, |span| span.end + 1);
                    lines.splice(
                        at..at,
                        [LOGBOOK_DRAWER.to_string(), entry, DRAWER_END.to_string()],
                    );
                }
            }
            *self = Self::parse(&lines.join("\n"));
        }

        fn raw_lines(&self) -> Vec<String> {
            if self.raw.is_empty() {
                vec![]
            } else {
                self.raw.split('\n').map(str::to_string).collect()
            }
        }
    }

    /// Body text with one more clock entry; existing entries keep their order.
    pub fn add_logbook_entry(
        body: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        elapsed: &str,
    ) -> String {
        let mut payload = Payload::parse(body);
        payload.add_logbook_entry(start, end, elapsed);
        payload.into_body()
    }

    /// Body text with an inactive timestamp for `now` on its own line.
    pub fn stamp_capture(body: &str, now: NaiveDateTime) -> String {
        let stamp = inactive_timestamp(now);
        if body.is_empty() {
            stamp
        } else if body.ends_with('\n') {
            format!("{body}{stamp}")
        } else {
            format!("{body}\n{stamp}")
        }
    }

    /// `[2025-11-15 Sat 10:00]`
    pub fn inactive_timestamp(at: NaiveDateTime) -> String {
        at.format("[%Y-%m-%d %a %H:%M]").to_string()
    }

    fn find_drawer(lines: &[&str], name: &str, skip: Option<LineSpan>) -> Option<LineSpan> {
        let outside = |idx: usize| !skip.is_some_and(|s| s.contains(idx));
        let start = (0..lines.len())
            .find(|&idx| outside(idx) && lines[idx].trim().eq_ignore_ascii_case(name))?;
        let end = (start + 1..lines.len())
            .find(|&idx| outside(idx) && lines[idx].trim().eq_ignore_ascii_case(DRAWER_END))?;
        Some(LineSpan { start, end })
    }

    fn property_line(indent: &str, key: &str, value: &str) -> String {
        format!("{indent}:{key}: {value}").trim_end().to_string()
    }

    fn leading_whitespace(line: &str) -> &str {
        &line[..line.len() - line.trim_start().len()]
    }

}

pub mod store {
    //! The record-store seam. Nodes are plain values; every navigation step is an explicit
    //! lookup against an [`OutlineStore`].

    use crate::core::{DocumentId, DocumentRecord, NodeId, OutlineNode};
    use anyhow::{Context, Result};
    use serde::{Deserialize, Serialize};
    use std::{collections::BTreeMap, fs, path::Path};

    /// Record store holding nodes and the documents they belong to.
    ///
    /// Calls are synchronous and single-writer; nothing here is transactional.
    pub trait OutlineStore {
        fn node(&self, id: NodeId) -> Option<OutlineNode>;

        /// Children of `parent`, ordered by position.
        fn children(&self, parent: NodeId) -> Vec<OutlineNode>;

        /// Insert a node and return the id assigned to it.
        fn insert(&mut self, node: &OutlineNode) -> NodeId;

        /// Overwrite the record for `id`; returns the number of records touched.
        fn update(&mut self, id: NodeId, node: &OutlineNode) -> usize;

        /// Remove the record for `id` only; descendants are left alone.
        fn delete(&mut self, id: NodeId) -> usize;

        /// Nodes whose body contains `needle`, in id order.
        fn nodes_with_body_containing(&self, needle: &str) -> Vec<OutlineNode>;

        fn document(&self, id: DocumentId) -> Option<DocumentRecord>;

        fn document_by_name(&self, name: &str) -> Option<DocumentRecord>;

        /// Register a document together with its root container node.
        fn create_document(&mut self, name: &str) -> DocumentRecord;
    }

    /// In-memory arena of nodes indexed by id, serialisable as a JSON snapshot.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MemoryStore {
        #[serde(default)]
        next_node: u64,
        #[serde(default)]
        next_document: u64,
        #[serde(default)]
        nodes: BTreeMap<NodeId, OutlineNode>,
        #[serde(default)]
        documents: BTreeMap<DocumentId, DocumentRecord>,
    }

    impl MemoryStore {
        pub fn load_json(path: &Path) -> Result<Self> {
            let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
            serde_json::from_str(&text).with_context(|| format!("decoding snapshot {:?}", path))
        }

        pub fn save_json(&self, path: &Path) -> Result<()> {
            let text = serde_json::to_string_pretty(self)?;
            fs::write(path, text.as_bytes()).with_context(|| format!("writing {:?}", path))
        }

        pub fn len(&self) -> usize {
            self.nodes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.nodes.is_empty()
        }

        pub fn documents(&self) -> impl Iterator<Item = &DocumentRecord> {
            self.documents.values()
        }
    }

    impl OutlineStore for MemoryStore {
        fn node(&self, id: NodeId) -> Option<OutlineNode> {
            self.nodes.get(&id).cloned()
        }

        fn children(&self, parent: NodeId) -> Vec<OutlineNode> {
            let mut out: Vec<OutlineNode> = self
                .nodes
                .values()
                .filter(|n| n.parent_id == Some(parent))
                .cloned()
                .collect();
            out.sort_by_key(|n| (n.position, n.id));
            out
        }

        fn insert(&mut self, node: &OutlineNode) -> NodeId {
            let id = NodeId(self.next_node);
            self.next_node += 1;
            let mut record = node.clone();
            record.id = Some(id);
            self.nodes.insert(id, record);
            id
        }

        fn update(&mut self, id: NodeId, node: &OutlineNode) -> usize {
            match self.nodes.get_mut(&id) {
                Some(slot) => {
                    *slot = node.clone();
                    slot.id = Some(id);
                    1
                }
                None => 0,
            }
        }

        fn delete(&mut self, id: NodeId) -> usize {
            usize::from(self.nodes.remove(&id).is_some())
        }

        fn nodes_with_body_containing(&self, needle: &str) -> Vec<OutlineNode> {
            self.nodes
                .values()
                .filter(|n| n.body.contains(needle))
                .cloned()
                .collect()
        }

        fn document(&self, id: DocumentId) -> Option<DocumentRecord> {
            self.documents.get(&id).cloned()
        }

        fn document_by_name(&self, name: &str) -> Option<DocumentRecord> {
            self.documents.values().find(|d| d.name == name).cloned()
        }

        fn create_document(&mut self, name: &str) -> DocumentRecord {
            let id = DocumentId(self.next_document);
            self.next_document += 1;
            let mut root = OutlineNode::new(0, name);
            root.document_id = Some(id);
            let root = self.insert(&root);
            let record = DocumentRecord {
                id,
                name: name.to_string(),
                root,
            };
            self.documents.insert(id, record.clone());
            record
        }
    }

}

pub mod node {
    //! Navigation, ordering and policy queries on [`OutlineNode`] against a store.

    use crate::core::{DocumentRecord, EditConfig, NodeId, OutlineError, OutlineNode, split_tags};
    use crate::payload::Payload;
    use crate::store::OutlineStore;
    use tracing::debug;

    impl OutlineNode {
        pub fn load<S: OutlineStore + ?Sized>(store: &S, id: NodeId) -> Result<Self, OutlineError> {
            store
                .node(id)
                .ok_or_else(|| OutlineError::NodeNotFound(format!("id {id}")))
        }

        /// Copy of the content fields with no identity or placement, for staging a
        /// desired state.
        pub fn staged_copy(&self) -> Self {
            Self {
                id: None,
                parent_id: None,
                document_id: None,
                ..self.clone()
            }
        }

        pub fn is_persisted(&self) -> bool {
            self.id.is_some()
        }

        /// Insert when unsaved, update otherwise.
        pub fn write<S: OutlineStore + ?Sized>(&mut self, store: &mut S) -> NodeId {
            match self.id {
                Some(id) => {
                    if store.update(id, self) == 0 {
                        debug!(node = %id, "update touched no record");
                    }
                    id
                }
                None => {
                    let id = store.insert(self);
                    self.id = Some(id);
                    id
                }
            }
        }

        /* ------------------------------ Content ------------------------------ */

        pub fn payload(&self) -> Payload {
            Payload::parse(&self.body)
        }

        pub fn set_body(&mut self, body: impl Into<String>) {
            self.body = body.into();
        }

        pub fn cleaned_body(&self) -> String {
            self.payload().cleaned_body().to_string()
        }

        pub fn is_habit_like(&self) -> bool {
            self.payload().property("STYLE") == Some("habit")
        }

        pub fn tag_list(&self) -> Vec<String> {
            split_tags(&self.tags)
        }

        pub fn inherited_tag_list(&self) -> Vec<String> {
            split_tags(&self.inherited_tags)
        }

        /// Same name, tags, priority, keyword and body.
        pub fn content_eq(&self, other: &OutlineNode) -> bool {
            self.name == other.name
                && self.tags == other.tags
                && self.priority == other.priority
                && self.todo == other.todo
                && self.body == other.body
        }

        /* ----------------------------- Navigation ----------------------------- */

        pub fn children<S: OutlineStore + ?Sized>(&self, store: &S) -> Vec<OutlineNode> {
            match self.id {
                Some(id) => store.children(id),
                None => vec![],
            }
        }

        pub fn child_names<S: OutlineStore + ?Sized>(&self, store: &S) -> Vec<String> {
            self.children(store).into_iter().map(|c| c.name).collect()
        }

        pub fn child<S: OutlineStore + ?Sized>(&self, name: &str, store: &S) -> Option<OutlineNode> {
            self.children(store).into_iter().find(|c| c.name == name)
        }

        pub fn has_children<S: OutlineStore + ?Sized>(&self, store: &S) -> bool {
            !self.children(store).is_empty()
        }

        pub fn parent<S: OutlineStore + ?Sized>(&self, store: &S) -> Result<OutlineNode, OutlineError> {
            self.parent_id
                .and_then(|id| store.node(id))
                .ok_or_else(|| OutlineError::NodeNotFound(format!("parent of {:?}", self.name)))
        }

        pub fn siblings<S: OutlineStore + ?Sized>(
            &self,
            store: &S,
        ) -> Result<Vec<OutlineNode>, OutlineError> {
            let parent = self.parent(store).map_err(|_| {
                OutlineError::InvalidOperation(format!("couldn't get parent for node {:?}", self.name))
            })?;
            Ok(parent.children(store))
        }

        pub fn sibling_names<S: OutlineStore + ?Sized>(
            &self,
            store: &S,
        ) -> Result<Vec<String>, OutlineError> {
            Ok(self.siblings(store)?.into_iter().map(|s| s.name).collect())
        }

        /// Self followed by every descendant, depth-first pre-order.
        pub fn descendants<S: OutlineStore + ?Sized>(&self, store: &S) -> Vec<OutlineNode> {
            let mut out = vec![self.clone()];
            for child in self.children(store) {
                out.extend(child.descendants(store));
            }
            out
        }

        /* ------------------------------ Ordering ------------------------------ */

        /// Move every sibling at or after this node's position one slot down.
        pub fn shift_next_siblings<S: OutlineStore + ?Sized>(
            &self,
            store: &mut S,
        ) -> Result<usize, OutlineError> {
            let mut shifted = 0;
            for mut sibling in self.siblings(&*store)? {
                if sibling.position >= self.position && sibling.id != self.id {
                    sibling.position += 1;
                    sibling.write(store);
                    debug!(name = %sibling.name, position = sibling.position, "sibling shifted");
                    shifted += 1;
                }
            }
            Ok(shifted)
        }

        /// Persist this node as a child of `parent` at `position`, renumbering the
        /// siblings that follow.
        pub fn insert_under<S: OutlineStore + ?Sized>(
            &mut self,
            parent: &OutlineNode,
            position: u32,
            store: &mut S,
        ) -> Result<NodeId, OutlineError> {
            let parent_id = parent.id.ok_or_else(|| {
                OutlineError::InvalidOperation(format!(
                    "cannot insert under unsaved node {:?}",
                    parent.name
                ))
            })?;
            self.parent_id = Some(parent_id);
            self.document_id = parent.document_id;
            self.level = parent.level.saturating_add(1);
            self.position = position;
            let id = self.write(store);
            self.shift_next_siblings(store)?;
            Ok(id)
        }

        /// Bring every descendant's level and document in line with this node; returns
        /// how many records changed.
        pub fn relevel_descendants<S: OutlineStore + ?Sized>(&self, store: &mut S) -> usize {
            let mut changed = 0;
            for mut child in self.children(&*store) {
                let level = self.level.saturating_add(1);
                if child.level != level || child.document_id != self.document_id {
                    child.level = level;
                    child.document_id = self.document_id;
                    child.write(store);
                    changed += 1;
                }
                changed += child.relevel_descendants(store);
            }
            changed
        }

        /* ------------------------------ Documents ------------------------------ */

        pub fn document<S: OutlineStore + ?Sized>(&self, store: &S) -> Option<DocumentRecord> {
            self.document_id.and_then(|id| store.document(id))
        }

        /// Owning document name, empty when the document is unknown.
        pub fn document_name<S: OutlineStore + ?Sized>(&self, store: &S) -> String {
            self.document(store).map(|d| d.name).unwrap_or_default()
        }

        pub fn set_document_by_name<S: OutlineStore + ?Sized>(
            &mut self,
            name: &str,
            store: &S,
        ) -> Result<(), OutlineError> {
            let doc = store
                .document_by_name(name)
                .ok_or_else(|| OutlineError::DocumentNotFound(name.to_string()))?;
            self.document_id = Some(doc.id);
            Ok(())
        }

        pub fn is_document_root<S: OutlineStore + ?Sized>(&self, store: &S) -> bool {
            self.id.is_some() && self.document(store).map(|d| Some(d.root)) == Some(self.id)
        }

        /* ------------------------------- Policy ------------------------------- */

        /// Whether the heading itself may be edited. Document roots, the agenda's
        /// second level and agenda block separators are not.
        pub fn is_editable<S: OutlineStore + ?Sized>(&self, store: &S, config: &EditConfig) -> bool {
            if self.id.is_none() {
                return true;
            }
            if self.parent_id.is_none() {
                return false;
            }
            if let Some(agenda) = store.document_by_name(&config.agenda_document) {
                if self.parent_id == Some(agenda.root) {
                    return false;
                }
                if self.document_id == Some(agenda.id)
                    && self.name.starts_with(&config.block_separator_prefix)
                {
                    return false;
                }
            }
            true
        }

        /// Whether children may be added or changed under this node.
        pub fn children_editable<S: OutlineStore + ?Sized>(
            &self,
            store: &S,
            config: &EditConfig,
        ) -> bool {
            if self.id.is_none() {
                return false;
            }
            match store.document_by_name(&config.agenda_document) {
                Some(agenda) => self.document_id != Some(agenda.id),
                None => true,
            }
        }
    }

}

pub mod format {
    //! Markup rendering of single nodes and subtrees.

    use crate::core::OutlineNode;
    use crate::store::OutlineStore;

    /// `** TODO [#A] Title :tags:` followed, when non-empty, by a newline and the body.
    ///
    /// Level 0 renders without stars but keeps the leading space; the insertion point
    /// supplies the depth.
    pub fn serialize_to_markup(node: &OutlineNode) -> String {
        let mut buf = "*".repeat(node.level as usize);
        buf.push(' ');

        if !node.todo.is_empty() {
            buf.push_str(&node.todo);
            buf.push(' ');
        }

        if !node.priority.is_empty() {
            buf.push_str(&format!("[#{}] ", node.priority));
        }

        buf.push_str(&node.name);

        if !node.tags.is_empty() {
            buf.push_str(" :");
            buf.push_str(&node.tags);
            buf.push(':');
        }

        if !node.body.is_empty() {
            buf.push('\n');
            buf.push_str(&node.body);
        }
        buf
    }

    /// Render `node` and its descendants, one node per block. Document roots are skipped.
    pub fn format_subtree<S: OutlineStore + ?Sized>(node: &OutlineNode, store: &S) -> String {
        let mut out = String::new();
        for n in node.descendants(store) {
            if n.level == 0 && n.parent_id.is_none() {
                continue;
            }
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&serialize_to_markup(&n));
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    impl OutlineNode {
        pub fn to_markup(&self) -> String {
            serialize_to_markup(self)
        }
    }

}

pub mod identity {
    //! Stable cross-snapshot identifiers for nodes.
    //!
    //! An explicit `ID` property wins. Otherwise the identifier is an outline path,
    //! `olp:<document>:<ancestor>/.../<name>`, which changes whenever any name on the
    //! path changes.

    use crate::core::{EditConfig, NodeId, OutlineNode};
    use crate::store::OutlineStore;
    use std::collections::BTreeSet;

    pub const OLP_PREFIX: &str = "olp:";

    pub fn is_outline_path(id: &str) -> bool {
        id.starts_with(OLP_PREFIX)
    }

    pub fn resolve_stable_id<S: OutlineStore + ?Sized>(node: &OutlineNode, store: &S) -> String {
        let payload = node.payload();
        let explicit = payload.identifier();
        if !explicit.is_empty() {
            return explicit.to_string();
        }
        outline_path(node, store)
    }

    /// Outline path of `node`; empty when the ancestor chain is broken or cyclic, or the
    /// owning document is unknown.
    pub fn outline_path<S: OutlineStore + ?Sized>(node: &OutlineNode, store: &S) -> String {
        let Some(mut parent_id) = node.parent_id else {
            return match node.document(store) {
                Some(doc) => format!("{OLP_PREFIX}{}", doc.name),
                None => String::new(),
            };
        };

        let mut seen = BTreeSet::<NodeId>::new();
        let mut segments = vec![strip_bracketed(&node.name)];
        let top = loop {
            if !seen.insert(parent_id) {
                return String::new();
            }
            let Some(parent) = store.node(parent_id) else {
                return String::new();
            };
            match parent.parent_id {
                None => break parent,
                Some(next) => {
                    segments.push(strip_bracketed(&parent.name));
                    parent_id = next;
                }
            }
        };
        let Some(doc) = top.document(store) else {
            return String::new();
        };
        segments.reverse();
        format!("{OLP_PREFIX}{}:{}", doc.name, segments.join("/"))
    }

    /// Drop `[...]` annotations (statistics cookies, links) that outline path links
    /// cannot carry.
    pub fn strip_bracketed(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut rest = name;
        while let Some(open) = rest.find('[') {
            match rest[open..].find(']') {
                Some(close) => {
                    out.push_str(&rest[..open]);
                    rest = &rest[open + close + 1..];
                }
                None => break,
            }
        }
        out.push_str(rest);
        out
    }

    /// Locate the node an outline path points at. An empty heading path yields the
    /// document root.
    pub fn resolve_outline_path<S: OutlineStore + ?Sized>(
        store: &S,
        path: &str,
    ) -> Option<OutlineNode> {
        let rest = path.strip_prefix(OLP_PREFIX)?;
        let (document, headings) = rest.split_once(':').unwrap_or((rest, ""));
        let doc = store.document_by_name(document)?;
        let mut current = store.node(doc.root)?;
        for segment in headings.split('/').filter(|s| !s.is_empty()) {
            current = current
                .children(store)
                .into_iter()
                .find(|c| strip_bracketed(&c.name) == segment)?;
        }
        Some(current)
    }

    /// Map a node shown in the agenda view back to its source node via its explicit
    /// identifier. Anything outside the agenda, or without an explicit identifier, maps
    /// to itself; `None` means the source could not be found.
    pub fn find_original_node<S: OutlineStore + ?Sized>(
        node: &OutlineNode,
        store: &S,
        config: &EditConfig,
    ) -> Option<OutlineNode> {
        if node.parent_id.is_none() {
            return Some(node.clone());
        }
        let Some(agenda) = store.document_by_name(&config.agenda_document) else {
            return Some(node.clone());
        };
        if node.document_id != Some(agenda.id) {
            return Some(node.clone());
        }
        let id = resolve_stable_id(node, store);
        if id.is_empty() || is_outline_path(&id) {
            return Some(node.clone());
        }
        store
            .nodes_with_body_containing(&id)
            .into_iter()
            .find(|candidate| candidate.document_id != Some(agenda.id))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::fixtures::work_document;

        #[test]
        fn explicit_identifier_wins() {
            let mut fx = work_document();
            fx.report.body = ":PROPERTIES:\n:ID: rpt-1\n:END:".into();
            assert_eq!(resolve_stable_id(&fx.report, &fx.store), "rpt-1");
        }

        #[test]
        fn outline_path_strips_cookies() {
            let fx = work_document();
            assert_eq!(
                resolve_stable_id(&fx.outline, &fx.store),
                "olp:work.org:Projects/Write report /Outline"
            );
            assert_eq!(resolve_stable_id(&fx.projects, &fx.store), "olp:work.org:Projects");
            assert_eq!(resolve_stable_id(&fx.root, &fx.store), "olp:work.org");
        }

        #[test]
        fn identical_chains_give_identical_paths() {
            let mut fx = work_document();
            let mut a = OutlineNode::new(0, "Same");
            a.insert_under(&fx.inbox, 0, &mut fx.store).expect("a");
            let mut b = OutlineNode::new(0, "Same");
            b.insert_under(&fx.inbox, 1, &mut fx.store).expect("b");
            assert_eq!(
                resolve_stable_id(&a, &fx.store),
                resolve_stable_id(&b, &fx.store)
            );

            let before = resolve_stable_id(&a, &fx.store);
            let mut inbox = fx.inbox.clone();
            inbox.name = "Triage".into();
            inbox.write(&mut fx.store);
            assert_ne!(resolve_stable_id(&a, &fx.store), before);
        }

        #[test]
        fn broken_chain_yields_empty_path() {
            let mut fx = work_document();
            fx.store.delete(fx.projects.id.expect("id"));
            assert_eq!(resolve_stable_id(&fx.report, &fx.store), "");
        }

        #[test]
        fn unknown_document_yields_empty_path() {
            let mut fx = work_document();
            let mut loose_root = OutlineNode::new(0, "Loose");
            loose_root.write(&mut fx.store);
            assert_eq!(resolve_stable_id(&loose_root, &fx.store), "");

            let mut child = OutlineNode::new(1, "Child");
            child.parent_id = loose_root.id;
            child.write(&mut fx.store);
            assert_eq!(resolve_stable_id(&child, &fx.store), "");
        }

        #[test]
        fn bracket_stripping() {
            assert_eq!(strip_bracketed("Read [[link][book]] now"), "Read ] now");
            assert_eq!(strip_bracketed("Tasks [2/3]"), "Tasks ");
            assert_eq!(strip_bracketed("open [ bracket"), "open [ bracket");
        }

        #[test]
        fn outline_paths_resolve_back_to_nodes() {
            let fx = work_document();
            let path = resolve_stable_id(&fx.outline, &fx.store);
            let found = resolve_outline_path(&fx.store, &path).expect("resolved");
            assert_eq!(found.id, fx.outline.id);
            assert_eq!(
                resolve_outline_path(&fx.store, "olp:work.org").map(|n| n.id),
                Some(fx.root.id)
            );
            assert!(resolve_outline_path(&fx.store, "olp:work.org:Nowhere").is_none());
            assert!(resolve_outline_path(&fx.store, "id:abc").is_none());
        }

        #[test]
        fn agenda_copies_map_to_their_source() {
            let mut fx = work_document();
            let cfg = EditConfig::default();
            let mut report = fx.report.clone();
            report.body = ":PROPERTIES:\n:ID: rpt-1\n:END:".into();
            report.write(&mut fx.store);

            let agenda = fx.store.create_document(&cfg.agenda_document);
            let agenda_root = OutlineNode::load(&fx.store, agenda.root).expect("root");
            let mut block = OutlineNode::new(0, "Today");
            block.insert_under(&agenda_root, 0, &mut fx.store).expect("block");
            let mut copy = report.staged_copy();
            copy.insert_under(&block, 0, &mut fx.store).expect("copy");

            let original = find_original_node(&copy, &fx.store, &cfg).expect("original");
            assert_eq!(original.id, report.id);
            assert_eq!(
                find_original_node(&fx.errands, &fx.store, &cfg).map(|n| n.id),
                Some(fx.errands.id)
            );
        }
    }
}

pub mod edits {
    //! The edit generator: diffs node states into typed edit operations, hands them to a
    //! [`TextRewriter`] and persists the result.
    //!
    //! Batches are not transactional. A rewrite failure leaves the in-memory node with the
    //! fields already diffed; reload it from the store before retrying.

    use crate::core::{EditConfig, NodeId, OutlineError, OutlineNode};
    use crate::identity::{is_outline_path, resolve_outline_path, resolve_stable_id};
    use crate::payload;
    use crate::store::OutlineStore;
    use anyhow::{Result, bail};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use tracing::{debug, info, warn};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum EditKind {
        Heading,
        Todo,
        Priority,
        Body,
        Tags,
        Refile,
        AddHeading,
        Delete,
    }

    impl EditKind {
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Heading => "heading",
                Self::Todo => "todo",
                Self::Priority => "priority",
                Self::Body => "body",
                Self::Tags => "tags",
                Self::Refile => "refile",
                Self::AddHeading => "addheading",
                Self::Delete => "delete",
            }
        }
    }

    impl fmt::Display for EditKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// Addressing for a rewrite, captured when the operation is emitted.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EditTarget {
        pub node: Option<NodeId>,
        pub document: String,
        pub stable_id: String,
        pub title: String,
    }

    /// One atomic textual mutation. `value` depends on `kind`: the new title, keyword,
    /// priority, body or tag string, the new parent's stable id for a refile, the
    /// level-0 markup for an added heading, and empty for a delete.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EditOperation {
        pub kind: EditKind,
        pub target: EditTarget,
        pub value: String,
    }

    /// Applies edit operations to the canonical markup text.
    pub trait TextRewriter {
        fn apply(&mut self, edit: &EditOperation) -> Result<()>;
    }

    /// Rewriter that records each edit as an entry of an edits file, for a remote side
    /// to replay against its copy of the document.
    #[derive(Debug, Clone, Default)]
    pub struct EditJournal {
        entries: Vec<String>,
    }

    impl EditJournal {
        pub fn entries(&self) -> &[String] {
            &self.entries
        }

        pub fn to_text(&self) -> String {
            self.entries.concat()
        }
    }

    impl TextRewriter for EditJournal {
        fn apply(&mut self, edit: &EditOperation) -> Result<()> {
            let stable_id = &edit.target.stable_id;
            if stable_id.is_empty() {
                bail!(
                    "{} edit for {:?} has no stable identifier",
                    edit.kind,
                    edit.target.title
                );
            }
            let link = if is_outline_path(stable_id) {
                stable_id.clone()
            } else {
                format!("id:{stable_id}")
            };
            self.entries.push(format!(
                "* F(edit:{}) [[{}][{}]]\n** New value\n{}\n** End of edit\n",
                edit.kind, link, edit.target.title, edit.value
            ));
            Ok(())
        }
    }

    /// A single-writer edit session over one store and one rewriter.
    pub struct EditSession<'a, S: OutlineStore + ?Sized, R: TextRewriter + ?Sized> {
        store: &'a mut S,
        rewriter: &'a mut R,
        config: &'a EditConfig,
    }

    impl<'a, S: OutlineStore + ?Sized, R: TextRewriter + ?Sized> EditSession<'a, S, R> {
        pub fn new(store: &'a mut S, rewriter: &'a mut R, config: &'a EditConfig) -> Self {
            Self {
                store,
                rewriter,
                config,
            }
        }

        pub fn store(&self) -> &S {
            &*self.store
        }

        pub fn target_of(&self, node: &OutlineNode) -> EditTarget {
            EditTarget {
                node: node.id,
                document: node.document_name(&*self.store),
                stable_id: resolve_stable_id(node, &*self.store),
                title: node.name.clone(),
            }
        }

        fn operation(&self, kind: EditKind, node: &OutlineNode, value: &str) -> EditOperation {
            let target = self.target_of(node);
            debug!(%kind, target = %target.stable_id, "edit emitted");
            EditOperation {
                kind,
                target,
                value: value.to_string(),
            }
        }

        fn in_capture(&self, node: &OutlineNode) -> bool {
            node.document(&*self.store)
                .is_some_and(|d| d.name == self.config.capture_document)
        }

        fn rewrite(&mut self, edit: &EditOperation) -> Result<(), OutlineError> {
            self.rewriter
                .apply(edit)
                .map_err(|err| OutlineError::Rewrite {
                    target: edit.target.stable_id.clone(),
                    reason: format!("{err:#}"),
                })
        }

        /* ------------------------------- Diff ------------------------------- */

        /// Compare `existing` with `desired` field by field, emitting one operation per
        /// differing field and bringing `existing` up to date as each is emitted. A second
        /// diff against the same pair yields nothing.
        ///
        /// `olp` re-locates the new parent when `desired.parent_id` has no record.
        pub fn diff(
            &mut self,
            existing: &mut OutlineNode,
            desired: &OutlineNode,
            olp: &str,
        ) -> Result<Vec<EditOperation>, OutlineError> {
            let mut edits = Vec::new();

            if existing.name != desired.name {
                edits.push(self.operation(EditKind::Heading, existing, &desired.name));
                existing.name = desired.name.clone();
            }

            if existing.todo != desired.todo {
                edits.push(self.operation(EditKind::Todo, existing, &desired.todo));
                existing.todo = desired.todo.clone();
            }

            if existing.priority != desired.priority {
                edits.push(self.operation(EditKind::Priority, existing, &desired.priority));
                existing.priority = desired.priority.clone();
            }

            let body = desired.payload().into_body();
            if existing.body != body {
                edits.push(self.operation(EditKind::Body, existing, &body));
                existing.set_body(body);
            }

            if existing.tags != desired.tags {
                edits.push(self.operation(EditKind::Tags, existing, &desired.tags));
                existing.tags = desired.tags.clone();
            }

            if existing.parent_id != desired.parent_id {
                let parent = self.refile_parent(desired, olp)?;
                if parent.id != existing.parent_id {
                    self.check_refile_target(existing, &parent)?;
                    let parent_ref = resolve_stable_id(&parent, &*self.store);
                    edits.push(self.operation(EditKind::Refile, existing, &parent_ref));
                    existing.parent_id = parent.id;
                    existing.document_id = parent.document_id;
                    existing.level = parent.level.saturating_add(1);
                    existing.position = next_position(&parent, &*self.store);
                }
            }

            Ok(edits)
        }

        /// Desired parent record, else the node `olp` points at, else the capture root.
        fn refile_parent(
            &mut self,
            desired: &OutlineNode,
            olp: &str,
        ) -> Result<OutlineNode, OutlineError> {
            if let Some(parent) = desired.parent_id.and_then(|id| self.store.node(id)) {
                return Ok(parent);
            }
            if !olp.is_empty() {
                if let Some(parent) = resolve_outline_path(&*self.store, olp) {
                    debug!(%olp, parent = %parent.name, "refile parent resolved by outline path");
                    return Ok(parent);
                }
            }
            warn!(name = %desired.name, "refile parent not found; using capture container");
            self.capture_root()
        }

        /// A node cannot move under itself or any of its descendants.
        fn check_refile_target(
            &self,
            node: &OutlineNode,
            parent: &OutlineNode,
        ) -> Result<(), OutlineError> {
            let Some(parent_id) = parent.id else {
                return Ok(());
            };
            if node
                .descendants(&*self.store)
                .iter()
                .any(|n| n.id == Some(parent_id))
            {
                return Err(OutlineError::InvalidOperation(format!(
                    "cannot refile {:?} under {:?}, which is inside its own subtree",
                    node.name, parent.name
                )));
            }
            Ok(())
        }

        /// Root node of the capture document, creating the document on first use.
        pub fn capture_root(&mut self) -> Result<OutlineNode, OutlineError> {
            let name = &self.config.capture_document;
            let doc = match self.store.document_by_name(name) {
                Some(doc) => doc,
                None => self.store.create_document(name),
            };
            OutlineNode::load(&*self.store, doc.root)
        }

        /* ------------------------------- Apply ------------------------------- */

        /// Rewrite the text for every edit, then upsert the node. Nodes in the capture
        /// document have no backing text, so only the record is written.
        pub fn apply_and_persist(
            &mut self,
            node: &mut OutlineNode,
            edits: &[EditOperation],
        ) -> Result<NodeId, OutlineError> {
            if !self.in_capture(node) {
                for edit in edits {
                    self.rewrite(edit)?;
                }
            }
            let id = node.write(&mut *self.store);
            if edits.iter().any(|e| e.kind == EditKind::Refile) {
                let moved = node.relevel_descendants(&mut *self.store);
                debug!(node = %id, moved, "descendants re-levelled");
            }
            Ok(id)
        }

        pub fn diff_apply_persist(
            &mut self,
            existing: &mut OutlineNode,
            desired: &OutlineNode,
            olp: &str,
        ) -> Result<Vec<EditOperation>, OutlineError> {
            let edits = self.diff(existing, desired, olp)?;
            self.apply_and_persist(existing, &edits)?;
            Ok(edits)
        }

        /* ---------------------------- Structure ---------------------------- */

        /// ADD_HEADING for `content` under `parent`. The value is rendered at level 0;
        /// `content.level` is set to its depth under `parent`.
        pub fn create_child_heading(
            &self,
            parent: &OutlineNode,
            content: &mut OutlineNode,
        ) -> EditOperation {
            content.level = parent.level.saturating_add(1);
            let staged = OutlineNode {
                level: 0,
                ..content.clone()
            };
            self.operation(EditKind::AddHeading, parent, &staged.to_markup())
        }

        /// Append `content` as the last child of `parent`, rewriting the text first.
        pub fn add_child_heading(
            &mut self,
            parent: &OutlineNode,
            content: &mut OutlineNode,
        ) -> Result<EditOperation, OutlineError> {
            if !parent.children_editable(&*self.store, self.config) {
                return Err(OutlineError::InvalidOperation(format!(
                    "children of {:?} are not editable",
                    parent.name
                )));
            }
            let edit = self.create_child_heading(parent, content);
            if !self.in_capture(parent) {
                self.rewrite(&edit)?;
            }
            let position = next_position(parent, &*self.store);
            content.insert_under(parent, position, &mut *self.store)?;
            Ok(edit)
        }

        /// Emit and apply DELETE, then drop this node's record. Descendants are untouched;
        /// see [`EditSession::delete_subtree`].
        pub fn delete(&mut self, node: &OutlineNode) -> Result<EditOperation, OutlineError> {
            let id = node.id.ok_or_else(|| {
                OutlineError::InvalidOperation(format!("cannot delete unsaved node {:?}", node.name))
            })?;
            let edit = self.operation(EditKind::Delete, node, "");
            if !self.in_capture(node) {
                self.rewrite(&edit)?;
            }
            if self.store.delete(id) == 0 {
                return Err(OutlineError::NodeNotFound(format!("id {id}")));
            }
            info!(node = %id, name = %node.name, "node deleted");
            Ok(edit)
        }

        /// Delete `node` and all its descendants, children before parents.
        pub fn delete_subtree(
            &mut self,
            node: &OutlineNode,
        ) -> Result<Vec<EditOperation>, OutlineError> {
            let mut doomed = node.descendants(&*self.store);
            doomed.reverse();
            doomed.iter().map(|n| self.delete(n)).collect()
        }

        /* ------------------------------ Content ------------------------------ */

        /// Append a clock entry to the node's logbook as a BODY edit and persist it.
        pub fn add_logbook_entry(
            &mut self,
            node: &mut OutlineNode,
            start: NaiveDateTime,
            end: NaiveDateTime,
            elapsed: &str,
        ) -> Result<EditOperation, OutlineError> {
            let body = payload::add_logbook_entry(&node.body, start, end, elapsed);
            let edit = self.operation(EditKind::Body, node, &body);
            if !self.in_capture(node) {
                self.rewrite(&edit)?;
            }
            node.set_body(body);
            node.write(&mut *self.store);
            Ok(edit)
        }

        /// Persist `node`, then copy its content onto every other node carrying its
        /// explicit identifier (agenda copies and the like). Returns how many were copied.
        pub fn update_all_nodes(&mut self, node: &mut OutlineNode) -> usize {
            node.write(&mut *self.store);
            let id = node.payload().identifier().to_string();
            if id.is_empty() {
                return 0;
            }
            let mut copied = 0;
            for mut other in self.store.nodes_with_body_containing(&id) {
                if other.id == node.id || other.payload().identifier() != id {
                    continue;
                }
                other.name = node.name.clone();
                other.todo = node.todo.clone();
                other.priority = node.priority.clone();
                other.tags = node.tags.clone();
                other.body = node.body.clone();
                other.write(&mut *self.store);
                copied += 1;
            }
            debug!(%id, copied, "copies refreshed");
            copied
        }

        /// Stage `node` as the last entry of the capture document.
        pub fn capture(
            &mut self,
            node: &mut OutlineNode,
            now: NaiveDateTime,
        ) -> Result<NodeId, OutlineError> {
            if self.config.capture_with_timestamp {
                node.set_body(payload::stamp_capture(&node.body, now));
            }
            let root = self.capture_root()?;
            let position = next_position(&root, &*self.store);
            node.insert_under(&root, position, &mut *self.store)
        }
    }

    fn next_position<S: OutlineStore + ?Sized>(parent: &OutlineNode, store: &S) -> u32 {
        parent
            .children(store)
            .last()
            .map_or(0, |c| c.position.saturating_add(1))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::fixtures::work_document;
        use crate::store::MemoryStore;
        use anyhow::anyhow;
        use chrono::NaiveDate;

        struct Failing;

        impl TextRewriter for Failing {
            fn apply(&mut self, _edit: &EditOperation) -> Result<()> {
                Err(anyhow!("document is locked"))
            }
        }

        fn at(h: u32, m: u32) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 11, 15)
                .and_then(|d| d.and_hms_opt(h, m, 0))
                .expect("valid datetime")
        }

        #[test]
        fn keyword_change_emits_one_todo_edit() {
            let mut store = MemoryStore::default();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut store, &mut journal, &cfg);

            let mut existing = OutlineNode::new(1, "X");
            existing.todo = "TODO".into();
            let mut desired = existing.clone();
            desired.todo = "DONE".into();

            let edits = session.diff(&mut existing, &desired, "").expect("diff");
            assert_eq!(edits.len(), 1);
            assert_eq!(edits[0].kind, EditKind::Todo);
            assert_eq!(edits[0].value, "DONE");
            assert_eq!(existing.todo, "DONE");
        }

        #[test]
        fn second_diff_is_empty() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut existing = fx.report.clone();
            let mut desired = existing.staged_copy();
            desired.name = "Write final report".into();
            desired.priority = "B".into();
            desired.tags = "work".into();
            desired.body = "Due Friday.".into();
            desired.parent_id = fx.errands.id;

            let first = session.diff(&mut existing, &desired, "").expect("first");
            let kinds: Vec<_> = first.iter().map(|e| e.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    EditKind::Heading,
                    EditKind::Priority,
                    EditKind::Body,
                    EditKind::Tags,
                    EditKind::Refile
                ]
            );
            assert!(session.diff(&mut existing, &desired, "").expect("second").is_empty());
        }

        #[test]
        fn edits_address_the_node_as_it_was() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut existing = fx.errands.clone();
            let mut desired = existing.staged_copy();
            desired.name = "Chores".into();
            desired.parent_id = existing.parent_id;
            desired.todo = "NEXT".into();

            let edits = session.diff(&mut existing, &desired, "").expect("diff");
            assert_eq!(edits[0].target.stable_id, "olp:work.org:Errands");
            assert_eq!(edits[0].target.title, "Errands");
            assert_eq!(edits[1].target.title, "Chores");
        }

        #[test]
        fn refile_without_identifier_carries_an_outline_path() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut existing = fx.inbox.clone();
            let mut desired = existing.staged_copy();
            desired.parent_id = fx.report.id;

            let edits = session.diff(&mut existing, &desired, "").expect("diff");
            assert_eq!(edits.len(), 1);
            assert_eq!(edits[0].kind, EditKind::Refile);
            assert_eq!(edits[0].value, "olp:work.org:Projects/Write report ");
            assert_eq!(existing.parent_id, fx.report.id);
            assert_eq!(existing.level, 3);
        }

        #[test]
        fn refile_falls_back_to_outline_path_then_capture() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut existing = fx.inbox.clone();
            let mut desired = existing.staged_copy();
            desired.parent_id = Some(NodeId(999));
            let edits = session
                .diff(&mut existing, &desired, "olp:work.org:Errands")
                .expect("diff");
            assert_eq!(edits[0].value, "olp:work.org:Errands");
            assert_eq!(existing.parent_id, fx.errands.id);

            let mut stray = fx.projects.clone();
            let mut desired = stray.staged_copy();
            desired.parent_id = Some(NodeId(999));
            let edits = session.diff(&mut stray, &desired, "").expect("diff");
            assert_eq!(edits[0].value, "olp:mobileorg.org");
            assert_eq!(stray.document_name(session.store()), "mobileorg.org");
            assert_eq!(stray.level, 1);
        }

        #[test]
        fn fallback_refile_is_not_repeated() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut existing = fx.inbox.clone();
            let mut desired = existing.staged_copy();
            desired.parent_id = Some(NodeId(999));
            let first = session
                .diff(&mut existing, &desired, "olp:work.org:Errands")
                .expect("first");
            assert_eq!(first.len(), 1);
            let second = session
                .diff(&mut existing, &desired, "olp:work.org:Errands")
                .expect("second");
            assert!(second.is_empty());

            let mut stray = fx.projects.clone();
            let mut desired = stray.staged_copy();
            desired.parent_id = None;
            assert_eq!(session.diff(&mut stray, &desired, "").expect("capture").len(), 1);
            assert!(session.diff(&mut stray, &desired, "").expect("again").is_empty());
        }

        #[test]
        fn refile_into_own_subtree_is_refused() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            {
                let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

                let mut errands = fx.errands.clone();
                let mut desired = errands.staged_copy();
                desired.parent_id = errands.id;
                assert!(matches!(
                    session.diff_apply_persist(&mut errands, &desired, ""),
                    Err(OutlineError::InvalidOperation(_))
                ));

                let mut projects = fx.projects.clone();
                let mut desired = projects.staged_copy();
                desired.parent_id = fx.outline.id;
                assert!(matches!(
                    session.diff(&mut projects, &desired, ""),
                    Err(OutlineError::InvalidOperation(_))
                ));
            }

            let stored = OutlineNode::load(&fx.store, fx.errands.id.expect("id")).expect("load");
            assert_eq!(stored.parent_id, fx.root.id);
            assert!(journal.entries().is_empty());
        }

        #[test]
        fn refile_takes_a_free_position_and_relevels_the_subtree() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            {
                let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);
                let mut report = fx.report.clone();
                let mut desired = report.staged_copy();
                desired.parent_id = fx.root.id;
                session
                    .diff_apply_persist(&mut report, &desired, "")
                    .expect("refile");
            }

            let positions: Vec<_> = fx
                .root
                .children(&fx.store)
                .into_iter()
                .map(|n| (n.name, n.position))
                .collect();
            assert_eq!(
                positions,
                vec![
                    ("Projects".to_string(), 0),
                    ("Errands".to_string(), 1),
                    ("Inbox".to_string(), 2),
                    ("Write report [1/3]".to_string(), 3),
                ]
            );
            let report = OutlineNode::load(&fx.store, fx.report.id.expect("id")).expect("report");
            let outline = OutlineNode::load(&fx.store, fx.outline.id.expect("id")).expect("outline");
            assert_eq!(report.level, 1);
            assert_eq!(outline.level, 2);
            assert_eq!(journal.entries().len(), 1);
        }

        #[test]
        fn apply_writes_journal_and_record() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            {
                let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);
                let mut existing = fx.errands.clone();
                existing.body = ":PROPERTIES:\n:ID: e-1\n:END:".into();
                let mut desired = existing.clone();
                desired.todo = "TODO".into();
                session
                    .diff_apply_persist(&mut existing, &desired, "")
                    .expect("apply");
            }
            assert_eq!(
                journal.to_text(),
                "* F(edit:todo) [[id:e-1][Errands]]\n** New value\nTODO\n** End of edit\n"
            );
            let stored = OutlineNode::load(&fx.store, fx.errands.id.expect("id")).expect("load");
            assert_eq!(stored.todo, "TODO");
        }

        #[test]
        fn rewrite_failure_is_surfaced_and_nothing_is_written() {
            let mut fx = work_document();
            let mut failing = Failing;
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut failing, &cfg);

            let mut existing = fx.errands.clone();
            let mut desired = existing.clone();
            desired.name = "Chores".into();
            let err = session
                .diff_apply_persist(&mut existing, &desired, "")
                .expect_err("rewrite must fail");
            assert!(matches!(err, OutlineError::Rewrite { .. }));
            assert_eq!(existing.name, "Chores");
            let stored = OutlineNode::load(session.store(), fx.errands.id.expect("id")).expect("load");
            assert_eq!(stored.name, "Errands");
        }

        #[test]
        fn capture_document_skips_rewriting() {
            let mut store = MemoryStore::default();
            let mut failing = Failing;
            let cfg = EditConfig {
                capture_with_timestamp: true,
                ..EditConfig::default()
            };
            let mut session = EditSession::new(&mut store, &mut failing, &cfg);

            let mut note = OutlineNode::new(0, "Call plumber");
            session.capture(&mut note, at(9, 5)).expect("capture");
            assert_eq!(note.body, "[2025-11-15 Sat 09:05]");
            assert_eq!(note.level, 1);

            let mut desired = note.clone();
            desired.todo = "TODO".into();
            let edits = session
                .diff_apply_persist(&mut note, &desired, "")
                .expect("capture edits skip the rewriter");
            assert_eq!(edits.len(), 1);

            let mut second = OutlineNode::new(0, "Buy stamps");
            session.capture(&mut second, at(9, 10)).expect("capture");
            assert_eq!(second.position, 1);
        }

        #[test]
        fn child_heading_is_rendered_at_level_zero() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut content = OutlineNode::new(0, "Gather data");
            content.todo = "TODO".into();
            content.body = "From the Q3 sheet.".into();
            let edit = session
                .add_child_heading(&fx.report, &mut content)
                .expect("add");
            assert_eq!(edit.kind, EditKind::AddHeading);
            assert_eq!(edit.value, " TODO Gather data\nFrom the Q3 sheet.");
            assert_eq!(edit.target.title, "Write report [1/3]");
            assert_eq!(content.level, 3);
            assert_eq!(
                fx.report.child_names(session.store()),
                vec!["Outline", "Gather data"]
            );
        }

        #[test]
        fn delete_is_not_cascading() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let edit = session.delete(&fx.report).expect("delete");
            assert_eq!(edit.kind, EditKind::Delete);
            assert!(session.store().node(fx.outline.id.expect("id")).is_some());
            assert!(matches!(
                session.delete(&fx.report),
                Err(OutlineError::NodeNotFound(_))
            ));
            assert!(matches!(
                session.delete(&OutlineNode::new(1, "unsaved")),
                Err(OutlineError::InvalidOperation(_))
            ));
        }

        #[test]
        fn subtree_delete_goes_leaves_first() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let titles: Vec<String> = {
                let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);
                session
                    .delete_subtree(&fx.projects)
                    .expect("delete")
                    .into_iter()
                    .map(|e| e.target.title)
                    .collect()
            };
            assert_eq!(titles, vec!["Outline", "Write report [1/3]", "Projects"]);
            assert_eq!(fx.root.child_names(&fx.store), vec!["Errands", "Inbox"]);
            assert!(journal.entries()[0].contains("[[olp:work.org:Projects/Write report /Outline][Outline]]"));
        }

        #[test]
        fn logbook_entry_becomes_a_body_edit() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);

            let mut node = fx.inbox.clone();
            let edit = session
                .add_logbook_entry(&mut node, at(10, 0), at(11, 30), "1:30")
                .expect("logbook");
            assert_eq!(edit.kind, EditKind::Body);
            assert_eq!(node.payload().logbook().len(), 1);
            let stored = OutlineNode::load(session.store(), node.id.expect("id")).expect("load");
            assert_eq!(
                stored.body,
                ":LOGBOOK:\nCLOCK: [2025-11-15 Sat 10:00]--[2025-11-15 Sat 11:30] =>  1:30\n:END:"
            );
        }

        #[test]
        fn copies_follow_the_explicit_identifier() {
            let mut fx = work_document();
            let mut journal = EditJournal::default();
            let cfg = EditConfig::default();
            let body = ":PROPERTIES:\n:ID: rpt-1\n:END:";

            let mut report = fx.report.clone();
            report.body = body.into();
            report.write(&mut fx.store);
            let mut copy = report.staged_copy();
            copy.insert_under(&fx.inbox, 0, &mut fx.store).expect("copy");

            let mut session = EditSession::new(&mut fx.store, &mut journal, &cfg);
            report.todo = "DONE".into();
            assert_eq!(session.update_all_nodes(&mut report), 1);
            let refreshed = OutlineNode::load(session.store(), copy.id.expect("id")).expect("load");
            assert_eq!(refreshed.todo, "DONE");
            assert_eq!(refreshed.parent_id, fx.inbox.id);

            let mut plain = fx.errands.clone();
            assert_eq!(session.update_all_nodes(&mut plain), 0);
        }

        #[test]
        fn journal_rejects_edits_without_identifier() {
            let mut journal = EditJournal::default();
            let edit = EditOperation {
                kind: EditKind::Heading,
                target: EditTarget {
                    node: None,
                    document: String::new(),
                    stable_id: String::new(),
                    title: "Orphan".into(),
                },
                value: "New".into(),
            };
            assert!(journal.apply(&edit).is_err());
            assert!(journal.entries().is_empty());
        }

        #[test]
        fn kinds_use_wire_names() {
            assert_eq!(
                serde_json::to_string(&EditKind::AddHeading).expect("json"),
                "\"addheading\""
            );
            assert_eq!(EditKind::Refile.to_string(), "refile");
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::core::OutlineNode;
    use crate::store::MemoryStore;

    /// `work.org`:
    ///
    /// ```text
    /// * Projects
    /// ** Write report [1/3]
    /// *** Outline
    /// * Errands :home:
    /// * Inbox
    /// ```
    pub(crate) struct WorkDocument {
        pub store: MemoryStore,
        pub root: OutlineNode,
        pub projects: OutlineNode,
        pub report: OutlineNode,
        pub outline: OutlineNode,
        pub errands: OutlineNode,
        pub inbox: OutlineNode,
    }

    pub(crate) fn work_document() -> WorkDocument {
        use crate::store::OutlineStore;

        let mut store = MemoryStore::default();
        let doc = store.create_document("work.org");
        let root = OutlineNode::load(&store, doc.root).expect("root");

        let mut add = |parent: &OutlineNode, position: u32, name: &str, tags: &str| {
            let mut node = OutlineNode::new(0, name);
            node.tags = tags.into();
            node.insert_under(parent, position, &mut store).expect("insert");
            node
        };
        let projects = add(&root, 0, "Projects", "");
        let report = add(&projects, 0, "Write report [1/3]", "");
        let outline = add(&report, 0, "Outline", "");
        let errands = add(&root, 1, "Errands", "home");
        let inbox = add(&root, 2, "Inbox", "");

        WorkDocument {
            store,
            root,
            projects,
            report,
            outline,
            errands,
            inbox,
        }
    }
}
