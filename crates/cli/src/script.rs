//! Learning-script segmentation.
//!
//! A learning script is a markdown document whose `## ` sections are the
//! ordered tasks for the team. Anything before the first section heading is
//! preamble and ignored.

/// One task cut out of a learning script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSection {
    pub title: String,
    pub body: String,
}

impl TaskSection {
    /// The task text handed to the team for this section.
    pub fn as_task(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }
}

/// Split a markdown document on second-level headings.
///
/// Only lines starting with exactly `## ` open a section; `###` and deeper
/// stay inside the current body.
pub fn parse_sections(markdown: &str) -> Vec<TaskSection> {
    let mut sections: Vec<TaskSection> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in markdown.lines() {
        if let Some(heading) = line.strip_prefix("## ")
            && !heading.starts_with('#')
        {
            if let Some((title, body)) = current.take() {
                sections.push(section(title, body));
            }
            current = Some((heading.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((title, body)) = current {
        sections.push(section(title, body));
    }
    sections
}

fn section(title: String, body: Vec<&str>) -> TaskSection {
    TaskSection {
        title,
        body: body.join("\n").trim().to_string(),
    }
}
