//! OOXML parsers (docx / xlsx / pptx) / Office 文档解析
//!
//! An OOXML file is a zip of XML parts. We stream the relevant parts with
//! quick-xml instead of building DOM trees, and prepend location markers
//! (`[Para:n]`, `[Slide:n]`, `[Sheet:name Row:r Col:C]`) so the snippet
//! generator can show where inside the document a hit came from.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParsedDocument;

fn open_part(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Result<String, String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| format!("missing part {}: {}", name, e))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(|e| e.to_string())?;
    Ok(xml)
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<std::fs::File>, String> {
    let file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    zip::ZipArchive::new(file).map_err(|e| e.to_string())
}

/// Word document: one line per non-empty paragraph / Word 段落提取
///
/// Table cell text lives inside `w:p` elements too, so paragraph
/// iteration covers tables without a separate pass.
pub fn parse_docx(path: &Path) -> Result<ParsedDocument, String> {
    let mut archive = open_archive(path)?;
    let xml = open_part(&mut archive, "word/document.xml")?;

    let mut reader = Reader::from_str(&xml);
    let mut lines: Vec<String> = Vec::new();
    let mut para = String::new();
    let mut in_text = false;
    let mut para_no = 0usize;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => para.clear(),
                _ => {}
            },
            Event::Text(t) if in_text => {
                para.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = para.trim();
                    if !text.is_empty() {
                        para_no += 1;
                        lines.push(format!("[Para:{}] {}", para_no, text));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ParsedDocument::content_only(lines.join("\n")))
}

/// Presentation: one line per slide / PPT 幻灯片提取
pub fn parse_pptx(path: &Path) -> Result<ParsedDocument, String> {
    let mut archive = open_archive(path)?;

    // 幻灯片按编号排序，不按 zip 目录顺序
    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            let n: usize = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut lines: Vec<String> = Vec::new();
    for (idx, (_, part)) in slides.iter().enumerate() {
        let xml = open_part(&mut archive, part)?;
        let mut reader = Reader::from_str(&xml);
        let mut texts: Vec<String> = Vec::new();
        let mut in_text = false;

        loop {
            match reader.read_event().map_err(|e| e.to_string())? {
                Event::Start(e) if e.name().as_ref() == b"a:t" => in_text = true,
                Event::Text(t) if in_text => {
                    let text = t.unescape().map_err(|e| e.to_string())?.trim().to_string();
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"a:t" => in_text = false,
                Event::Eof => break,
                _ => {}
            }
        }

        if texts.is_empty() {
            lines.push(format!("[Slide:{}] (空白幻灯片)", idx + 1));
        } else {
            lines.push(format!("[Slide:{}] {}", idx + 1, texts.join(" ")));
        }
    }

    Ok(ParsedDocument::content_only(lines.join("\n")))
}

/// Workbook: every non-empty cell tagged with sheet, row and column /
/// Excel 单元格提取，附带位置标记
pub fn parse_xlsx(path: &Path) -> Result<ParsedDocument, String> {
    let mut archive = open_archive(path)?;
    let shared = read_shared_strings(&mut archive)?;
    let sheet_names = read_sheet_names(&mut archive)?;

    let mut lines: Vec<String> = Vec::new();
    for (idx, sheet_name) in sheet_names.iter().enumerate() {
        let part = format!("xl/worksheets/sheet{}.xml", idx + 1);
        let xml = match open_part(&mut archive, &part) {
            Ok(xml) => xml,
            // 工作表部件缺失时跳过该表，不拒绝整个文件
            Err(_) => continue,
        };
        read_sheet_cells(&xml, sheet_name, &shared, &mut lines)?;
    }

    Ok(ParsedDocument::content_only(lines.join("\n")))
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::fs::File>,
) -> Result<Vec<String>, String> {
    let xml = match open_part(archive, "xl/sharedStrings.xml") {
        Ok(xml) => xml,
        // 没有共享字符串表的工作簿（纯数字）是合法的
        Err(_) => return Ok(Vec::new()),
    };

    let mut reader = Reader::from_str(&xml);
    let mut strings: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(current.clone()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

fn read_sheet_names(
    archive: &mut zip::ZipArchive<std::fs::File>,
) -> Result<Vec<String>, String> {
    let xml = open_part(archive, "xl/workbook.xml")?;
    let mut reader = Reader::from_str(&xml);
    let mut names: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                if let Some(attr) = e.try_get_attribute("name").map_err(|e| e.to_string())? {
                    names.push(
                        attr.unescape_value().map_err(|e| e.to_string())?.into_owned(),
                    );
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

fn read_sheet_cells(
    xml: &str,
    sheet_name: &str,
    shared: &[String],
    lines: &mut Vec<String>,
) -> Result<(), String> {
    let mut reader = Reader::from_str(xml);
    let mut row_values: Vec<String> = Vec::new();
    let mut cell_ref = String::new();
    let mut cell_is_shared = false;
    let mut cell_value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.name().as_ref() {
                b"row" => row_values.clear(),
                b"c" => {
                    cell_ref.clear();
                    cell_value.clear();
                    cell_is_shared = false;
                    if let Some(attr) = e.try_get_attribute("r").map_err(|e| e.to_string())? {
                        cell_ref = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
                    }
                    if let Some(attr) = e.try_get_attribute("t").map_err(|e| e.to_string())? {
                        cell_is_shared = attr.value.as_ref() == b"s";
                    }
                }
                b"v" => in_value = true,
                _ => {}
            },
            Event::Text(t) if in_value => {
                cell_value.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"v" => in_value = false,
                b"c" => {
                    if !cell_value.is_empty() {
                        let value = if cell_is_shared {
                            cell_value
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| shared.get(i))
                                .cloned()
                                .unwrap_or_default()
                        } else {
                            cell_value.clone()
                        };
                        if !value.is_empty() {
                            let (col, row) = split_cell_ref(&cell_ref);
                            row_values.push(format!(
                                "[Sheet:{} Row:{} Col:{}] {}",
                                sheet_name, row, col, value
                            ));
                        }
                    }
                }
                b"row" => {
                    if !row_values.is_empty() {
                        lines.push(row_values.join(" "));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// "B12" → ("B", "12")
fn split_cell_ref(cell_ref: &str) -> (&str, &str) {
    let pos = cell_ref
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell_ref.len());
    (&cell_ref[..pos], &cell_ref[pos..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, parts: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, body) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_split_cell_ref() {
        assert_eq!(split_cell_ref("A1"), ("A", "1"));
        assert_eq!(split_cell_ref("AB72"), ("AB", "72"));
    }

    #[test]
    fn test_parse_docx_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        let body = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
    <w:p><w:r><w:t></w:t></w:r></w:p>
    <w:p><w:r><w:t>第二段内容</w:t></w:r><w:r><w:t> continued</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        write_zip(&path, &[("word/document.xml", body)]);

        let doc = parse_docx(&path).unwrap();
        assert_eq!(
            doc.content,
            "[Para:1] First paragraph\n[Para:2] 第二段内容 continued"
        );
    }

    #[test]
    fn test_parse_pptx_slides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let slide1 = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="x"><p:txBody><a:p><a:r><a:t>Title here</a:t></a:r><a:r><a:t>subtitle</a:t></a:r></a:p></p:txBody></p:sld>"#;
        let slide2 = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="x"></p:sld>"#;
        write_zip(
            &path,
            &[
                ("ppt/slides/slide2.xml", slide2),
                ("ppt/slides/slide1.xml", slide1),
            ],
        );

        let doc = parse_pptx(&path).unwrap();
        assert_eq!(
            doc.content,
            "[Slide:1] Title here subtitle\n[Slide:2] (空白幻灯片)"
        );
    }

    #[test]
    fn test_parse_xlsx_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let workbook = r#"<workbook><sheets><sheet name="销售" sheetId="1" r:id="rId1" xmlns:r="x"/></sheets></workbook>"#;
        let shared = r#"<sst><si><t>Revenue</t></si><si><t>总计</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>1024</v></c></row>
<row r="2"><c r="A2" t="s"><v>1</v></c></row>
</sheetData></worksheet>"#;
        write_zip(
            &path,
            &[
                ("xl/workbook.xml", workbook),
                ("xl/sharedStrings.xml", shared),
                ("xl/worksheets/sheet1.xml", sheet),
            ],
        );

        let doc = parse_xlsx(&path).unwrap();
        assert_eq!(
            doc.content,
            "[Sheet:销售 Row:1 Col:A] Revenue [Sheet:销售 Row:1 Col:B] 1024\n[Sheet:销售 Row:2 Col:A] 总计"
        );
    }

    #[test]
    fn test_parse_docx_missing_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        write_zip(&path, &[("other.xml", "<x/>")]);
        assert!(parse_docx(&path).is_err());
    }
}
