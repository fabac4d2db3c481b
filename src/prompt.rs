use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};
use std::borrow::Cow;

/// Main prompt, e.g. `local:_system> ` or `_system> ` for manual connections
pub struct ShellPrompt {
    label: String,
    multiline_indicator: String,
}

impl ShellPrompt {
    pub fn new(label: impl Into<String>, multiline_indicator: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            multiline_indicator: multiline_indicator.into(),
        }
    }
}

impl Prompt for ShellPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}> ", self.label))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        edit_mode_indicator(edit_mode)
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.multiline_indicator)
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        history_search_indicator(history_search)
    }
}

/// Prompt shown while a statement is still waiting for its `;`
pub struct ContinuationPrompt {
    prompt_text: String,
}

impl ContinuationPrompt {
    /// Right-align the indicator under the main prompt so continuation lines line up
    pub fn new(main_prompt_width: usize, indicator: &str) -> Self {
        let prompt_text = if indicator.is_empty() {
            String::new()
        } else {
            format!("{indicator:>main_prompt_width$}")
        };

        Self { prompt_text }
    }
}

impl Prompt for ContinuationPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.prompt_text)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        edit_mode_indicator(edit_mode)
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        history_search_indicator(history_search)
    }
}

fn edit_mode_indicator(edit_mode: PromptEditMode) -> Cow<'static, str> {
    match edit_mode {
        PromptEditMode::Default | PromptEditMode::Emacs => Cow::Borrowed(""),
        PromptEditMode::Vi(vi_mode) => match vi_mode {
            reedline::PromptViMode::Insert => Cow::Borrowed("[INS] "),
            reedline::PromptViMode::Normal => Cow::Borrowed("[NOR] "),
        },
        PromptEditMode::Custom(_) => Cow::Borrowed(""),
    }
}

fn history_search_indicator(history_search: PromptHistorySearch) -> Cow<'static, str> {
    let prefix = match history_search.status {
        PromptHistorySearchStatus::Passing => "",
        PromptHistorySearchStatus::Failing => "failing ",
    };
    match history_search.term.as_str() {
        "" => Cow::Owned(format!("({prefix}reverse-i-search): ")),
        term => Cow::Owned(format!("({prefix}reverse-i-search '{term}'): ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("local:_system", "local:_system> ")]
    #[case("_system", "_system> ")]
    fn test_shell_prompt(#[case] label: &str, #[case] expected: &str) {
        let prompt = ShellPrompt::new(label, "... ");
        assert_eq!(prompt.render_prompt_left(), expected);
        assert_eq!(prompt.render_prompt_multiline_indicator(), "... ");
    }

    #[rstest]
    #[case(10, "... ", "      ... ")]
    #[case(2, "... ", "... ")]
    #[case(10, "", "")]
    fn test_continuation_prompt(
        #[case] width: usize,
        #[case] indicator: &str,
        #[case] expected: &str,
    ) {
        let prompt = ContinuationPrompt::new(width, indicator);
        assert_eq!(prompt.render_prompt_left(), expected);
    }

    #[test]
    fn test_history_search_indicator() {
        let search = PromptHistorySearch::new(PromptHistorySearchStatus::Failing, "FOR".to_string());
        assert_eq!(
            history_search_indicator(search),
            "(failing reverse-i-search 'FOR'): "
        );
    }
}
