//! Prompt templates

use crate::selectors::SelectorCandidate;

/// Prompt asking for a JSON array of test cases grounded in `context`.
pub fn test_case_prompt(context: &str, user_prompt: &str) -> String {
    format!(
        r#"You are a test case generator. Based on the reference documentation below, generate test cases as a JSON array.

Reference Documentation:
{context}

User Request: {user_prompt}

Generate a JSON array of test case objects. Each object must have these exact fields:
- "id": unique identifier (string)
- "title": brief test case title (string)
- "scenario": description of the scenario (string)
- "steps": array of step strings
- "expected": expected outcome (string)
- "based_on": source document reference (string)

Important:
- Generate both positive and negative test cases based on the user request
- Use only information from the reference documentation
- Return ONLY valid JSON array, no markdown, no explanations
- Ensure the JSON is properly formatted and parseable

Example format:
[
  {{
    "id": "TC001",
    "title": "Valid discount code application",
    "scenario": "User applies a valid discount code",
    "steps": ["Navigate to checkout", "Enter discount code", "Apply code"],
    "expected": "Discount is applied successfully",
    "based_on": "discount_policy.pdf"
  }}
]

Now generate the test cases:"#
    )
}

/// Inputs of [`selenium_prompt`], already cut to their prompt limits.
#[derive(Debug, Clone)]
pub struct ScriptPromptInput<'a> {
    /// The submitted test case, pretty-printed when it parsed
    pub test_case: &'a str,
    pub scenario: &'a str,
    pub expected: &'a str,
    /// Steps as a pretty-printed JSON array
    pub steps: &'a str,
    pub html_excerpt: &'a str,
    pub selectors: &'a [SelectorCandidate],
    pub documentation: &'a str,
}

/// Prompt asking for a runnable Selenium script for one test case.
pub fn selenium_prompt(input: &ScriptPromptInput<'_>) -> Result<String, serde_json::Error> {
    let ScriptPromptInput {
        test_case,
        scenario,
        expected,
        steps,
        html_excerpt,
        selectors,
        documentation,
    } = input;
    let selectors = serde_json::to_string_pretty(selectors)?;

    Ok(format!(
        r#"You are a Selenium Python expert. Generate a complete, production-ready, runnable Python Selenium script.

TEST CASE TO AUTOMATE:
{test_case}

Test Scenario: {scenario}
Expected Result: {expected}
Test Steps: {steps}

CHECKOUT HTML STRUCTURE:
{html_excerpt}

AVAILABLE SELECTORS FROM HTML (use these - they are extracted from the actual HTML):
{selectors}

RELEVANT DOCUMENTATION:
{documentation}

CRITICAL REQUIREMENTS:
1. Write a COMPLETE, FULLY EXECUTABLE Python Selenium script
2. Import all necessary libraries: from selenium import webdriver, from selenium.webdriver.common.by import By, from selenium.webdriver.support.ui import WebDriverWait, from selenium.webdriver.support import expected_conditions as EC, from selenium.webdriver.chrome.service import Service, etc.
3. Use Chrome WebDriver with proper setup
4. Use EXPLICIT WAITS (WebDriverWait) for ALL element interactions - never use time.sleep() for waiting
5. Use selectors from the "Available Selectors" list above - prioritize ID selectors, then name, then class
6. If a needed selector is not in the list, infer a reasonable CSS selector based on the HTML structure
7. Follow the test case steps exactly: {steps}
8. Include proper error handling with try-except blocks
9. Add clear comments explaining each major step
10. Include a main execution block (if __name__ == "__main__")
11. Make the script verify the expected result: {expected}
12. Return ONLY valid Python code - NO markdown, NO explanations, NO code fences

SCRIPT STRUCTURE:
- Imports
- WebDriver setup
- Test execution following the test case steps
- Assertions/verifications for expected results
- Error handling
- Cleanup (driver.quit())
- Main block

Generate the complete Selenium Python script now:"#
    ))
}
