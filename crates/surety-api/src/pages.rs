//! Inline HTML pages for the identity-verification flow.
//!
//! The original deployment shipped these as static files next to the
//! backend; three small constants keep the service a single binary.

/// Registration page served at `/`.
pub const INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Surety - Register</title>
  </head>
  <body>
    <h1>Create your account</h1>
    <p>After registering you will be redirected to verify your identity.</p>
    <form action="/auth/register" method="post">
      <label>First name <input name="firstname" required /></label><br />
      <label>Last name <input name="lastname" required /></label><br />
      <label>Username <input name="username" required /></label><br />
      <label>Email <input name="email" type="email" required /></label><br />
      <label>Identification <input name="identification" required /></label><br />
      <label>Password <input name="password" type="password" required /></label><br />
      <button type="submit">Register</button>
    </form>
  </body>
</html>
"#;

/// Shown when the identity inspection came back approved.
pub const IDENTITY_SUCCESS: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Surety - Identity verified</title>
  </head>
  <body>
    <h1>Your identity has been verified</h1>
    <p>Your account is now fully active.</p>
  </body>
</html>
"#;

/// Shown when the identity inspection was not approved.
pub const IDENTITY_DECLINED: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Surety - Verification declined</title>
  </head>
  <body>
    <h1>We could not verify your identity</h1>
    <p>Please contact support to continue with your registration.</p>
  </body>
</html>
"#;
