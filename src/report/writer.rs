//! Dual text/HTML report output.
//!
//! Every line goes to both outputs. In HTML, lines are grouped into `<pre>`
//! blocks between section headings, and a table of contents can be emitted
//! as links to the section anchors.

use std::io::Write;

use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::format::bar;
use crate::error::CompassError;

const STYLE: &str = "body { font-family: sans-serif; } \
pre { font-family: monospace; margin: 0 0 1em 0; } \
h2 { border-bottom: 1px solid #888; }";

/// Writes a report as plain text and as HTML at the same time.
pub struct ReportWriter<T: Write, H: Write> {
    text: T,
    html: Writer<H>,
    in_pre: bool,
}

impl<T: Write, H: Write> ReportWriter<T, H> {
    /// Start both outputs; the HTML document head uses `title`.
    pub fn new(text: T, html: H, title: &str) -> Result<Self> {
        let mut html = Writer::new(html);
        html.write_event(Event::DocType(BytesText::from_escaped("html")))?;
        html.write_event(Event::Start(BytesStart::new("html")))?;
        html.write_event(Event::Start(BytesStart::new("head")))?;
        html.write_event(Event::Empty(
            BytesStart::new("meta").with_attributes([("charset", "utf-8")]),
        ))?;
        write_element(&mut html, "title", title)?;
        write_element(&mut html, "style", STYLE)?;
        html.write_event(Event::End(BytesEnd::new("head")))?;
        html.write_event(Event::Start(BytesStart::new("body")))?;
        write_element(&mut html, "h1", title)?;

        Ok(Self {
            text,
            html,
            in_pre: false,
        })
    }

    /// Write one line of report text.
    pub fn line(&mut self, line: &str) -> Result<()> {
        writeln!(self.text, "{}", line).map_err(write_error)?;
        self.open_pre()?;
        self.html
            .write_event(Event::Text(BytesText::new(&format!("{}\n", line))))?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<()> {
        self.line("")
    }

    /// Start a titled section with an anchor for the table of contents.
    pub fn section(&mut self, title: &str, anchor: &str) -> Result<()> {
        let separator = bar('-');
        writeln!(self.text, "\n{}\n--- {}\n{}", separator, title, separator)
            .map_err(write_error)?;
        self.close_pre()?;
        self.html.write_event(Event::Start(
            BytesStart::new("h2").with_attributes([("id", anchor)]),
        ))?;
        self.html.write_event(Event::Text(BytesText::new(title)))?;
        self.html.write_event(Event::End(BytesEnd::new("h2")))?;
        Ok(())
    }

    /// Emit a table-of-contents link (HTML only).
    pub fn toc_link(&mut self, title: &str, anchor: &str) -> Result<()> {
        self.close_pre()?;
        let href = format!("#{}", anchor);
        self.html.write_event(Event::Start(
            BytesStart::new("a").with_attributes([("href", href.as_str())]),
        ))?;
        self.html.write_event(Event::Text(BytesText::new(title)))?;
        self.html.write_event(Event::End(BytesEnd::new("a")))?;
        self.html
            .write_event(Event::Empty(BytesStart::new("br")))?;
        Ok(())
    }

    /// Close the HTML document and return both outputs.
    pub fn finish(mut self) -> Result<(T, H)> {
        self.close_pre()?;
        self.html.write_event(Event::End(BytesEnd::new("body")))?;
        self.html.write_event(Event::End(BytesEnd::new("html")))?;
        self.text.flush().map_err(write_error)?;
        let mut html = self.html.into_inner();
        html.flush().map_err(write_error)?;
        Ok((self.text, html))
    }

    fn open_pre(&mut self) -> Result<()> {
        if !self.in_pre {
            self.html.write_event(Event::Start(BytesStart::new("pre")))?;
            self.in_pre = true;
        }
        Ok(())
    }

    fn close_pre(&mut self) -> Result<()> {
        if self.in_pre {
            self.html.write_event(Event::End(BytesEnd::new("pre")))?;
            self.in_pre = false;
        }
        Ok(())
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_error(e: std::io::Error) -> anyhow::Error {
    CompassError::HtmlGenerationError {
        message: e.to_string(),
    }
    .into()
}
