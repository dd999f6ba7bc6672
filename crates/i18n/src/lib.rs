use std::collections::BTreeMap;

use core_types::UiLanguage;

#[derive(Debug, Clone)]
pub struct I18n {
    lang: UiLanguage,
    zh_cn: BTreeMap<&'static str, &'static str>,
    en_us: BTreeMap<&'static str, &'static str>,
}

impl Default for I18n {
    fn default() -> Self {
        Self::new(UiLanguage::EnUs)
    }
}

impl I18n {
    pub fn new(lang: UiLanguage) -> Self {
        Self {
            lang,
            zh_cn: zh_cn_map(),
            en_us: en_us_map(),
        }
    }

    pub fn set_language(&mut self, lang: UiLanguage) {
        self.lang = lang;
    }

    pub fn language(&self) -> UiLanguage {
        self.lang
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.lang {
            UiLanguage::ZhCn => self
                .zh_cn
                .get(key)
                .copied()
                .or_else(|| self.en_us.get(key).copied())
                .unwrap_or(key),
            UiLanguage::EnUs => self
                .en_us
                .get(key)
                .copied()
                .or_else(|| self.zh_cn.get(key).copied())
                .unwrap_or(key),
        }
    }

    /// Looks up `key` and substitutes `{name}` placeholders.
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter()
            .fold(self.t(key).to_owned(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

fn zh_cn_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "Agent Studio"),
        ("nav.home", "首页"),
        ("nav.auth", "登录"),
        ("nav.agents", "智能体"),
        ("nav.knowledge_base", "知识库"),
        ("nav.actions", "动作"),
        ("nav.profile", "个人资料"),
        ("toast.error", "错误"),
        ("toast.success", "成功"),
        ("auth.required", "请先登录"),
        ("auth.signup_ok.title", "注册成功"),
        ("auth.signup_ok.desc", "请查收邮件以确认账户。"),
        ("auth.signin_ok.title", "欢迎回来！"),
        ("auth.signin_ok.desc", "您已成功登录。"),
        ("auth.error", "认证错误"),
        ("auth.signed_out", "已退出登录"),
        ("profile.mismatch.title", "密码不一致"),
        ("profile.mismatch.desc", "两次输入的密码不一致，请重试。"),
        ("profile.short.title", "密码过短"),
        ("profile.short.desc", "密码长度至少为 6 个字符。"),
        ("profile.updated.title", "密码已更新"),
        ("profile.updated.desc", "您的密码已成功更新。"),
        ("profile.update_failed", "更新失败"),
        ("kb.fetch_failed", "获取知识库失败"),
        ("kb.name_required", "请输入知识库名称"),
        ("kb.created", "知识库创建成功"),
        ("kb.create_failed", "知识库创建失败"),
        ("kb.updated", "知识库更新成功"),
        ("kb.update_failed", "知识库更新失败"),
        ("kb.deleted", "知识库删除成功"),
        ("kb.delete_failed", "知识库删除失败"),
        ("items.fetch_failed", "获取知识条目失败"),
        ("items.no_base.title", "未选择知识库"),
        ("items.no_base.desc", "请先选择或创建一个知识库。"),
        ("items.invalid_type.title", "文件类型无效"),
        ("items.invalid_type.desc", "请上传 PDF 文件。"),
        ("items.empty_url", "请输入网址"),
        ("items.empty_text", "请输入标题和内容"),
        ("items.pdf_uploaded.title", "PDF 上传成功"),
        ("items.pdf_uploaded.desc", "文档正在处理中..."),
        ("items.pdf_processed.title", "PDF 处理成功"),
        ("items.url_added.title", "网址添加成功"),
        ("items.url_added.desc", "网页内容正在处理中..."),
        ("items.url_processed.title", "网页处理成功"),
        ("items.processed.desc", "内容已提取并保存。"),
        ("items.processing_failed", "处理失败"),
        ("items.pdf_failed", "PDF 文件处理失败"),
        ("items.url_failed", "网址处理失败"),
        ("items.text_added.title", "文本添加成功"),
        ("items.text_added.desc", "自定义文本已添加到知识库。"),
        ("items.text_failed", "文本添加失败"),
        ("items.deleted.title", "条目已删除"),
        ("items.deleted.desc", "知识库条目已移除。"),
        ("items.delete_failed", "删除失败"),
        ("agents.fetch_failed", "获取智能体失败"),
        ("agents.name_required", "请输入智能体名称"),
        ("agents.kb_required", "请选择知识库"),
        ("agents.pdf_required", "请上传 PDF 文件"),
        ("agents.created", "智能体创建成功"),
        ("agents.create_failed", "智能体创建失败"),
        ("agents.updated", "智能体更新成功"),
        ("agents.update_failed", "智能体更新失败"),
        ("agents.deleted", "智能体删除成功"),
        ("agents.delete_failed", "智能体删除失败"),
        ("agents.embedding_failed.title", "知识向量生成失败"),
        ("agents.embedding_failed.desc", "智能体已创建，但知识向量未能生成。"),
        ("agents.unknown_kb", "未知"),
        ("avatar.not_image", "请上传图片文件"),
        ("avatar.too_large", "文件大小必须小于 5MB"),
        ("avatar.uploaded", "头像上传成功"),
        ("avatar.upload_failed", "头像上传失败"),
        ("avatar.removed", "头像已移除"),
        ("avatar.remove_failed", "头像移除失败"),
        ("usage.voice_started.title", "语音通话已开始"),
        ("usage.voice_started.desc", "与 {name} 的语音对话已开启"),
        ("usage.chat_started.title", "聊天已开始"),
        ("usage.chat_started.desc", "与 {name} 的文字对话已开启"),
        ("usage.agent_error", "智能体错误"),
        ("usage.agent_error.desc", "获取智能体回复失败。"),
        ("usage.listening.title", "正在聆听"),
        ("usage.listening.desc", "请说话，我在听..."),
        ("actions.coming_soon", "即将推出"),
        ("actions.under_development", "动作功能正在开发中"),
    ])
}

fn en_us_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "Agent Studio"),
        ("nav.home", "Home"),
        ("nav.auth", "Sign In"),
        ("nav.agents", "Agents"),
        ("nav.knowledge_base", "Knowledge Base"),
        ("nav.actions", "Actions"),
        ("nav.profile", "Profile"),
        ("toast.error", "Error"),
        ("toast.success", "Success"),
        ("auth.required", "User not authenticated"),
        ("auth.signup_ok.title", "Sign up successful"),
        (
            "auth.signup_ok.desc",
            "Please check your email to confirm your account.",
        ),
        ("auth.signin_ok.title", "Welcome back!"),
        ("auth.signin_ok.desc", "You have successfully signed in."),
        ("auth.error", "Authentication Error"),
        ("auth.signed_out", "Signed out"),
        ("profile.mismatch.title", "Password mismatch"),
        (
            "profile.mismatch.desc",
            "Passwords do not match. Please try again.",
        ),
        ("profile.short.title", "Password too short"),
        (
            "profile.short.desc",
            "Password must be at least 6 characters long.",
        ),
        ("profile.updated.title", "Password updated"),
        (
            "profile.updated.desc",
            "Your password has been successfully updated.",
        ),
        ("profile.update_failed", "Update failed"),
        ("kb.fetch_failed", "Failed to fetch knowledge bases"),
        ("kb.name_required", "Please enter a knowledge base name"),
        ("kb.created", "Knowledge base created successfully"),
        ("kb.create_failed", "Failed to create knowledge base"),
        ("kb.updated", "Knowledge base updated successfully"),
        ("kb.update_failed", "Failed to update knowledge base"),
        ("kb.deleted", "Knowledge base deleted successfully"),
        ("kb.delete_failed", "Failed to delete knowledge base"),
        ("items.fetch_failed", "Failed to fetch knowledge items"),
        ("items.no_base.title", "No knowledge base selected"),
        (
            "items.no_base.desc",
            "Please select or create a knowledge base first.",
        ),
        ("items.invalid_type.title", "Invalid file type"),
        ("items.invalid_type.desc", "Please upload a PDF file."),
        ("items.empty_url", "Please enter a URL"),
        ("items.empty_text", "Please enter a title and content"),
        ("items.pdf_uploaded.title", "PDF uploaded successfully"),
        ("items.pdf_uploaded.desc", "Your document is being processed..."),
        ("items.pdf_processed.title", "PDF processed successfully"),
        ("items.url_added.title", "URL added successfully"),
        ("items.url_added.desc", "Website content is being processed..."),
        ("items.url_processed.title", "Website processed successfully"),
        ("items.processed.desc", "Content has been extracted and saved."),
        ("items.processing_failed", "Processing failed"),
        ("items.pdf_failed", "Failed to process PDF file"),
        ("items.url_failed", "Failed to process website URL"),
        ("items.text_added.title", "Text added successfully"),
        (
            "items.text_added.desc",
            "Your custom text has been added to the knowledge base.",
        ),
        ("items.text_failed", "Failed to add text"),
        ("items.deleted.title", "Item deleted"),
        ("items.deleted.desc", "Knowledge base item has been removed."),
        ("items.delete_failed", "Delete failed"),
        ("agents.fetch_failed", "Failed to fetch agents"),
        ("agents.name_required", "Please enter an agent name"),
        ("agents.kb_required", "Please select a knowledge base"),
        ("agents.pdf_required", "Please upload a PDF file"),
        ("agents.created", "Agent created successfully"),
        ("agents.create_failed", "Failed to create agent"),
        ("agents.updated", "Agent updated successfully"),
        ("agents.update_failed", "Failed to update agent"),
        ("agents.deleted", "Agent deleted successfully"),
        ("agents.delete_failed", "Failed to delete agent"),
        ("agents.embedding_failed.title", "Embedding generation failed"),
        (
            "agents.embedding_failed.desc",
            "The agent was created, but its knowledge embedding could not be generated.",
        ),
        ("agents.unknown_kb", "Unknown"),
        ("avatar.not_image", "Please upload an image file"),
        ("avatar.too_large", "File size must be less than 5MB"),
        ("avatar.uploaded", "Avatar uploaded successfully"),
        ("avatar.upload_failed", "Failed to upload avatar"),
        ("avatar.removed", "Avatar removed successfully"),
        ("avatar.remove_failed", "Failed to remove avatar"),
        ("usage.voice_started.title", "Voice Call Started"),
        (
            "usage.voice_started.desc",
            "Voice conversation with {name} is now active",
        ),
        ("usage.chat_started.title", "Chat Started"),
        (
            "usage.chat_started.desc",
            "Text conversation with {name} is now active",
        ),
        ("usage.agent_error", "Agent Error"),
        ("usage.agent_error.desc", "Failed to get agent response."),
        ("usage.listening.title", "Listening"),
        ("usage.listening.desc", "Speak now, I'm listening..."),
        ("actions.coming_soon", "Coming Soon"),
        (
            "actions.under_development",
            "Actions feature is under development",
        ),
    ])
}
