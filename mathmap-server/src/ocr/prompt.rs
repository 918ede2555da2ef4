//! Instruction template sent to the completion service

/// Build the solving prompt around the cleaned OCR text
///
/// The reply is requested as one JSON object:
/// `{"question": {"main", "sub_questions": [{"id", "content"}]}, "analysis": {id: text}, "answer": {id: text}}`
pub fn build_prompt(cleaned_text: &str) -> String {
    format!(
        r#"你是一名数学教育专家。请先整理下面这道题目的内容，再逐题解答。

原始题目：
{cleaned_text}

请严格按照下面的JSON格式返回：
{{
    "question": {{
        "main": "题目的主要要求",
        "sub_questions": [
            {{"id": "1", "content": "第1小题的完整算式，例如 59×2.5×0.4=□×(□×□)"}}
        ]
    }},
    "analysis": {{
        "1": "第1小题的解题思路"
    }},
    "answer": {{
        "1": "第1小题的答案"
    }}
}}

要求：
1. sub_questions 中每个 content 都要包含完整算式，保留等号和空位
2. 需要填空的位置用□表示
3. 保持原题的格式和符号
4. 只返回JSON，不要附加任何说明文字"#
    )
}
