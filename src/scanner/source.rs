//! Heuristic classifier for annotated C++ headers and sources.
//!
//! Each file is scanned line by line. A marker line (`UCLASS(...)`,
//! `USTRUCT(...)`, `UENUM(...)`, `UINTERFACE(...)`, `UFUNCTION(...)`) opens a
//! bounded lookahead for the matching header; a header that does not show up
//! inside the window means the marker is dropped. There is no real C++
//! parsing here: no preprocessor, no brace matching, no templates.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use super::discovery::{has_extension, TreeWalker, WalkedFile};
use crate::error::{ScanDiagnostics, ScanIssue};
use crate::types::{CallableEntity, DeclarationEntity, DeclarationKind, EnumValue, ModuleRef, Parameter};

/// Lines searched after a marker for its header.
pub const DECLARATION_WINDOW: usize = 10;
/// Lines searched after an enum header for its entries.
pub const ENUM_WINDOW: usize = 50;

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(UCLASS|USTRUCT|UENUM|UINTERFACE|UFUNCTION)\s*\(").expect("valid marker regex")
});

static TYPE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(class|struct)\s+(?:[A-Z0-9_]+_API\s+)?([A-Za-z_]\w*)(?:\s+final)?\s*(?::\s*(?:(?:public|protected|private)\s+)?(?:virtual\s+)?(?:::)?([A-Za-z_][\w:]*))?",
    )
    .expect("valid type header regex")
});

static ENUM_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*enum\s+(?:class\s+|struct\s+)?([A-Za-z_]\w*)(?:\s*:\s*[\w:]+)?")
        .expect("valid enum header regex")
});

static ENUM_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*(?:=\s*(-?(?:0[xX][0-9a-fA-F]+|\d+)))?$").expect("valid enum entry regex")
});

static UMETA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UMETA\s*\(").expect("valid umeta regex"));

static CALLABLE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<ret>[A-Za-z_][\w:<>,\s\*&]*?)\s*\b(?P<name>[A-Za-z_]\w*)\s*\(")
        .expect("valid callable header regex")
});

static PARAMETER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<ty>.*?)\s*\b(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?$").expect("valid parameter regex")
});

static UPARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^UPARAM\s*\((?:[^()]|\([^()]*\))*\)\s*").expect("valid uparam regex"));

const RETURN_QUALIFIERS: &[&str] = &[
    "virtual",
    "static",
    "inline",
    "FORCEINLINE",
    "FORCENOINLINE",
    "explicit",
    "friend",
    "constexpr",
];

const NOT_CALLABLE_NAMES: &[&str] = &["if", "for", "while", "switch", "return", "sizeof", "catch"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Declaration(DeclarationKind),
    Callable,
}

impl Marker {
    fn from_token(token: &str) -> Option<Marker> {
        match token {
            "UCLASS" => Some(Marker::Declaration(DeclarationKind::Class)),
            "USTRUCT" => Some(Marker::Declaration(DeclarationKind::Struct)),
            "UENUM" => Some(Marker::Declaration(DeclarationKind::Enum)),
            "UINTERFACE" => Some(Marker::Declaration(DeclarationKind::Interface)),
            "UFUNCTION" => Some(Marker::Callable),
            _ => None,
        }
    }
}

/// A marker line split into its specifiers and whatever follows the `)`.
#[derive(Debug)]
struct MarkerLine<'a> {
    marker: Marker,
    specifiers: Vec<String>,
    rest: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeHeader {
    keyword: String,
    name: String,
    parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CallableHead {
    return_type: String,
    name: String,
    after_paren: String,
}

/// Entities recovered from a single file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileClassification {
    pub declarations: Vec<DeclarationEntity>,
    pub callables: Vec<CallableEntity>,
}

/// Entities recovered from one module, in file walk order.
#[derive(Debug, Clone, Default)]
pub struct ModuleClassification {
    pub module: String,
    pub declarations: Vec<DeclarationEntity>,
    pub callables: Vec<CallableEntity>,
    pub files_scanned: usize,
    pub diagnostics: ScanDiagnostics,
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

fn match_marker(line: &str) -> Option<MarkerLine<'_>> {
    let captures = MARKER_RE.captures(line)?;
    let marker = Marker::from_token(captures.get(1)?.as_str())?;
    let open = captures.get(0)?.end();
    let (inner, rest) = balanced_parens(&line[open..]);
    Some(MarkerLine {
        marker,
        specifiers: split_specifiers(inner),
        rest,
    })
}

/// Split `text` (just past an opening paren) at its matching close paren.
/// Unbalanced text is returned whole with an empty remainder.
fn balanced_parens(text: &str) -> (&str, &str) {
    let mut depth = 1usize;
    let mut in_quotes = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (&text[..idx], &text[idx + 1..]);
                }
            }
            _ => {}
        }
    }
    (text, "")
}

/// Split specifiers on commas outside parentheses and quotes.
pub fn split_specifiers(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_quotes = false;

    for ch in args.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes => {
                depth -= 1;
                current.push(ch);
            }
            ',' if !in_quotes && depth <= 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    out.push(current);

    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_type_header(line: &str) -> Option<TypeHeader> {
    let captures = TYPE_HEADER_RE.captures(line)?;
    let parent = captures.get(3).map(|m| m.as_str().to_string());
    // `class UFoo;` is a forward declaration, not a definition.
    if parent.is_none() && line.trim_end().ends_with(';') {
        return None;
    }
    Some(TypeHeader {
        keyword: captures.get(1)?.as_str().to_string(),
        name: captures.get(2)?.as_str().to_string(),
        parent,
    })
}

fn parse_enum_header(line: &str) -> Option<String> {
    if line.trim_end().ends_with(';') && !line.contains('{') {
        return None;
    }
    let captures = ENUM_HEADER_RE.captures(line)?;
    Some(captures.get(1)?.as_str().to_string())
}

fn parse_callable_head(line: &str) -> Option<CallableHead> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || MARKER_RE.is_match(line) {
        return None;
    }
    let captures = CALLABLE_HEADER_RE.captures(line)?;
    let name = captures.name("name")?.as_str();
    if NOT_CALLABLE_NAMES.contains(&name) {
        return None;
    }
    let return_type = normalize_return_type(captures.name("ret")?.as_str());
    if return_type.is_empty() {
        return None;
    }
    let after_paren = line[captures.get(0)?.end()..].to_string();
    Some(CallableHead {
        return_type,
        name: name.to_string(),
        after_paren,
    })
}

fn normalize_return_type(raw: &str) -> String {
    raw.split_whitespace()
        .skip_while(|token| RETURN_QUALIFIERS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a parameter list on commas at parenthesis depth zero.
///
/// Angle brackets are not tracked, so `TMap<FString, int32> Values` is split
/// into two pieces. Callers get exactly what the text says.
pub fn parse_parameters(params: &str) -> Vec<Parameter> {
    let trimmed = params.trim();
    if trimmed.is_empty() || trimmed == "void" {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => pieces.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    pieces.push(current);

    pieces.iter().filter_map(|piece| parse_parameter(piece)).collect()
}

fn parse_parameter(piece: &str) -> Option<Parameter> {
    let without_default = piece.split('=').next().unwrap_or("").trim();
    let without_uparam = UPARAM_RE.replace(without_default, "");
    let text = without_uparam.trim();
    if text.is_empty() {
        return None;
    }
    let captures = PARAMETER_RE.captures(text)?;
    let name = captures.name("name")?.as_str().to_string();
    let param_type = captures
        .name("ty")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some(Parameter::new(name, param_type))
}

/// Remove every `UMETA(...)` annotation, nested parens included.
fn strip_umeta(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(found) = UMETA_RE.find(rest) {
        out.push_str(&rest[..found.start()]);
        rest = balanced_parens(&rest[found.end()..]).1;
    }
    out.push_str(rest);
    out
}

/// Entries from one enum body line, plus whether the body closed on it.
fn parse_enum_line(line: &str) -> (Vec<EnumValue>, bool) {
    let code = strip_umeta(line.split("//").next().unwrap_or(""));
    let (code, closed) = match code.find('}') {
        Some(idx) => (&code[..idx], true),
        None => (code.as_str(), false),
    };
    let code = code.replace('{', "");

    let values = code
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let captures = ENUM_ENTRY_RE.captures(entry)?;
            let name = captures.get(1)?.as_str().to_string();
            let value = captures.get(2).and_then(|m| parse_integer(m.as_str()));
            Some(EnumValue { name, value })
        })
        .collect();
    (values, closed)
}

fn parse_integer(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Line-state scanner over one file.
struct LineScanner<'a> {
    lines: Vec<&'a str>,
    module: &'a str,
    file_path: &'a Path,
    owner: String,
    out: FileClassification,
}

impl<'a> LineScanner<'a> {
    fn new(content: &'a str, module: &'a str, file_path: &'a Path) -> Self {
        Self {
            lines: content.lines().collect(),
            module,
            file_path,
            owner: String::new(),
            out: FileClassification::default(),
        }
    }

    fn run(mut self) -> FileClassification {
        for index in 0..self.lines.len() {
            let line = self.lines[index];
            if is_comment(line) {
                continue;
            }
            if let Some(marker_line) = match_marker(line) {
                match marker_line.marker {
                    Marker::Declaration(kind) => self.handle_declaration(index, kind, marker_line),
                    Marker::Callable => self.handle_callable(index, marker_line),
                }
            } else if let Some(header) = parse_type_header(line) {
                self.owner = header.name;
            }
        }
        self.out
    }

    fn window_end(&self, from: usize, window: usize) -> usize {
        (from + window + 1).min(self.lines.len())
    }

    /// Look for a header on the rest of the marker line, then in the window.
    /// A second marker inside the window abandons the search.
    fn find_header<T>(
        &self,
        marker_index: usize,
        rest: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<(usize, T)> {
        if let Some(found) = parse(rest) {
            return Some((marker_index, found));
        }
        for index in marker_index + 1..self.window_end(marker_index, DECLARATION_WINDOW) {
            let line = self.lines[index];
            if is_comment(line) {
                continue;
            }
            if MARKER_RE.is_match(line) {
                return None;
            }
            if let Some(found) = parse(line) {
                return Some((index, found));
            }
        }
        None
    }

    fn handle_declaration(&mut self, index: usize, kind: DeclarationKind, marker: MarkerLine<'_>) {
        if kind == DeclarationKind::Enum {
            let Some((header_index, name)) = self.find_header(index, marker.rest, parse_enum_header) else {
                debug!("{}:{} UENUM without header", self.file_path.display(), index + 1);
                return;
            };
            let values = self.collect_enum_values(header_index);
            let decl = DeclarationEntity::new(name, kind)
                .with_specifiers(marker.specifiers)
                .with_enum_values(values)
                .with_origin(self.module, self.file_path.to_path_buf(), header_index + 1);
            self.out.declarations.push(decl);
            return;
        }

        let keyword = if kind == DeclarationKind::Struct { "struct" } else { "class" };
        let found = self.find_header(index, marker.rest, |line| {
            parse_type_header(line).filter(|header| header.keyword == keyword)
        });
        let Some((header_index, header)) = found else {
            debug!(
                "{}:{} {} without matching header",
                self.file_path.display(),
                index + 1,
                kind.marker()
            );
            return;
        };

        self.owner = header.name.clone();
        let mut decl = DeclarationEntity::new(header.name, kind)
            .with_specifiers(marker.specifiers)
            .with_origin(self.module, self.file_path.to_path_buf(), header_index + 1);
        if let Some(parent) = header.parent.filter(|_| kind.has_parent_clause()) {
            decl = decl.with_parent(parent);
        }
        self.out.declarations.push(decl);
    }

    fn collect_enum_values(&self, header_index: usize) -> Vec<EnumValue> {
        let mut values = Vec::new();

        let header = self.lines[header_index];
        if let Some(open) = header.find('{') {
            let (found, closed) = parse_enum_line(&header[open + 1..]);
            values.extend(found);
            if closed {
                return values;
            }
        }

        for index in header_index + 1..self.window_end(header_index, ENUM_WINDOW) {
            let line = self.lines[index];
            if is_comment(line) {
                continue;
            }
            let (found, closed) = parse_enum_line(line);
            values.extend(found);
            if closed {
                break;
            }
        }
        values
    }

    fn handle_callable(&mut self, index: usize, marker: MarkerLine<'_>) {
        let Some((head_index, head)) = self.find_header(index, marker.rest, parse_callable_head) else {
            debug!("{}:{} UFUNCTION without signature", self.file_path.display(), index + 1);
            return;
        };

        let params = self.collect_parameter_text(index, head_index, &head.after_paren);
        let callable = CallableEntity::new(head.name)
            .with_owner(self.owner.clone())
            .with_return_type(head.return_type)
            .with_parameters(parse_parameters(&params))
            .with_specifiers(marker.specifiers)
            .with_origin(self.module, self.file_path.to_path_buf(), head_index + 1);
        self.out.callables.push(callable);
    }

    /// Text between the signature's parentheses, following continuation
    /// lines until the parens balance or the marker's window runs out.
    fn collect_parameter_text(&self, marker_index: usize, head_index: usize, first: &str) -> String {
        let mut text = String::new();
        let mut depth = 1i32;

        let continuation = (head_index + 1..self.window_end(marker_index, DECLARATION_WINDOW))
            .map(|index| self.lines[index]);
        for segment in std::iter::once(first).chain(continuation) {
            for ch in segment.chars() {
                match ch {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            return text;
                        }
                    }
                    _ => {}
                }
                text.push(ch);
            }
            text.push(' ');
        }
        text
    }
}

/// Classify one file's text. Pure; never fails.
pub fn classify_source(content: &str, module: &str, file_path: &Path) -> FileClassification {
    LineScanner::new(content, module, file_path).run()
}

enum FileOutcome {
    Classified(FileClassification),
    Skipped(ScanIssue),
}

/// Walks module source trees and classifies every recognised file.
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    walker: TreeWalker,
    extensions: Vec<String>,
    parallel: bool,
}

impl SourceClassifier {
    pub fn new(walker: TreeWalker, extensions: Vec<String>, parallel: bool) -> Self {
        Self {
            walker,
            extensions,
            parallel,
        }
    }

    pub fn classify_module(&self, module: &ModuleRef) -> ModuleClassification {
        let mut result = ModuleClassification {
            module: module.name.clone(),
            ..ModuleClassification::default()
        };

        let mut walk = self
            .walker
            .walk(&module.source_path, |path| has_extension(path, &self.extensions));
        let files: Vec<WalkedFile> = walk.by_ref().collect();
        result
            .diagnostics
            .record_many(ScanIssue::DirectoryUnreadable, walk.unreadable_entries());

        let classify = |file: &WalkedFile| classify_file(&file.path, &module.name);
        // Indexed collect keeps walk order so later files still win merges.
        let outcomes: Vec<FileOutcome> = if self.parallel {
            files.par_iter().map(classify).collect()
        } else {
            files.iter().map(classify).collect()
        };

        for outcome in outcomes {
            match outcome {
                FileOutcome::Classified(found) => {
                    result.files_scanned += 1;
                    result.declarations.extend(found.declarations);
                    result.callables.extend(found.callables);
                }
                FileOutcome::Skipped(issue) => result.diagnostics.record(issue),
            }
        }

        debug!(
            "Module {}: {} files, {} declarations, {} callables",
            module.name,
            result.files_scanned,
            result.declarations.len(),
            result.callables.len()
        );
        result
    }
}

fn classify_file(path: &Path, module: &str) -> FileOutcome {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Skipping unreadable source {}: {}", path.display(), err);
            return FileOutcome::Skipped(ScanIssue::FileUnreadable);
        }
    };
    match String::from_utf8(bytes) {
        Ok(content) => {
            let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
            FileOutcome::Classified(classify_source(content, module, path))
        }
        Err(_) => {
            let err = io::Error::new(io::ErrorKind::InvalidData, "not valid UTF-8");
            debug!("Skipping unparseable source {}: {}", path.display(), err);
            FileOutcome::Skipped(ScanIssue::FileUnparseable)
        }
    }
}
