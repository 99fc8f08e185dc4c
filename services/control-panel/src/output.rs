//! Line-capped output panels

use std::collections::VecDeque;

use crate::ansi::AnsiConverter;
use crate::message::OutputPanel;

/// Rendered HTML lines of one output panel, capped to the most recent lines
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
    converter: AnsiConverter,
}

impl OutputBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_lines.min(1024)),
            max_lines,
            converter: AnsiConverter::new(),
        }
    }

    /// Append a chunk of output; it may contain several lines
    pub fn append(&mut self, text: &str) {
        for line in text.split('\n') {
            let html = self.converter.to_html(line.trim_end_matches('\r'));
            self.lines.push_back(html);
        }
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn last_line(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Panel content as HTML
    pub fn html(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// All output panels of the dashboard
#[derive(Debug, Clone)]
pub struct OutputPanels {
    start: OutputBuffer,
    stop: OutputBuffer,
    restart: OutputBuffer,
    update: OutputBuffer,
    log: OutputBuffer,
    polyfier_log: OutputBuffer,
    polyfier: OutputBuffer,
}

impl OutputPanels {
    pub fn new(max_lines: usize) -> Self {
        Self {
            start: OutputBuffer::new(max_lines),
            stop: OutputBuffer::new(max_lines),
            restart: OutputBuffer::new(max_lines),
            update: OutputBuffer::new(max_lines),
            log: OutputBuffer::new(max_lines),
            polyfier_log: OutputBuffer::new(max_lines),
            polyfier: OutputBuffer::new(max_lines),
        }
    }

    pub fn get(&self, panel: OutputPanel) -> &OutputBuffer {
        match panel {
            OutputPanel::Start => &self.start,
            OutputPanel::Stop => &self.stop,
            OutputPanel::Restart => &self.restart,
            OutputPanel::Update => &self.update,
            OutputPanel::Log => &self.log,
            OutputPanel::Polyfier => &self.polyfier,
        }
    }

    pub fn get_mut(&mut self, panel: OutputPanel) -> &mut OutputBuffer {
        match panel {
            OutputPanel::Start => &mut self.start,
            OutputPanel::Stop => &mut self.stop,
            OutputPanel::Restart => &mut self.restart,
            OutputPanel::Update => &mut self.update,
            OutputPanel::Log => &mut self.log,
            OutputPanel::Polyfier => &mut self.polyfier,
        }
    }

    /// Log panel shown on the polyfier running page
    pub fn polyfier_log(&self) -> &OutputBuffer {
        &self.polyfier_log
    }

    pub fn polyfier_log_mut(&mut self) -> &mut OutputBuffer {
        &mut self.polyfier_log
    }
}

/// Gradle progress lines of a healthy update, e.g. `Task :core:compileJava UP-TO-DATE`
pub fn is_routine_gradle_line(line: &str) -> bool {
    let line = line.trim_end();
    line.starts_with("Task :")
        && ["started", "skipped", "UP-TO-DATE", "SUCCESS"]
            .iter()
            .any(|suffix| line.ends_with(suffix))
}
