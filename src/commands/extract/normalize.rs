use crate::adapter::RawElement;
use crate::config::PipelineConfig;
use crate::model::{Element, ElementKind};

pub(super) struct NormalizeOutcome {
    pub(super) elements: Vec<Element>,
    pub(super) footer_elements_dropped: usize,
}

/// Map adapter output into the uniform element shape, dropping footer
/// elements and boilerplate lines. Order is preserved: it is the sole
/// signal for page-range reconstruction and heading-to-body association.
pub(super) fn normalize_elements(raw: &[RawElement], config: &PipelineConfig) -> NormalizeOutcome {
    let mut elements = Vec::<Element>::with_capacity(raw.len());
    let mut footer_elements_dropped = 0usize;

    for raw_element in raw {
        if raw_element.kind == ElementKind::Footer {
            footer_elements_dropped += 1;
            continue;
        }

        let kept_lines = raw_element
            .text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !config.is_boilerplate_line(line))
            .collect::<Vec<&str>>();

        if kept_lines.is_empty() {
            if !raw_element.text.trim().is_empty() {
                footer_elements_dropped += 1;
            }
            continue;
        }

        elements.push(Element {
            text: kept_lines.join("\n"),
            kind: raw_element.kind,
            page_number: raw_element.page_number,
            font_info: None,
        });
    }

    NormalizeOutcome {
        elements,
        footer_elements_dropped,
    }
}
